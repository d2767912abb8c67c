//! Typed slice of the ComfyUI history record.
//!
//! After a prompt completes, `GET /history/{prompt_id}` returns a map
//! keyed by prompt id; each entry lists per-node outputs. Only the
//! image references are modeled -- the record carries plenty more
//! (timings, status, node metadata) that this bridge never reads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Completion record of one prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Outputs keyed by node id.
    #[serde(default)]
    pub outputs: HashMap<String, NodeOutput>,
}

/// Outputs of a single node. Nodes without image outputs simply omit
/// the `images` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Three-part coordinate identifying one artifact on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    /// Storage category, e.g. `"output"` or `"temp"`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl HistoryRecord {
    /// Every artifact reference across all output nodes.
    pub fn image_refs(&self) -> impl Iterator<Item = &ImageRef> {
        self.outputs.values().flat_map(|node| node.images.iter())
    }
}
