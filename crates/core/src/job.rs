//! The caller-facing job contract.
//!
//! The hosting job-invocation framework hands the worker a JSON payload
//! with an opaque workflow graph and optional input images, and expects
//! either `{"images": [...]}` on success or `{"error": "<message>"}`.
//! Binary payloads cross this boundary base64-encoded; everything past
//! it works with raw bytes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::Artifact;

/// Error string returned when a job completes without producing images.
///
/// A completed workflow with no image outputs is a reportable outcome,
/// not a protocol failure.
pub const NO_IMAGES_ERROR: &str = "No images generated";

/// Input payload of one job invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    /// Opaque node-id -> node-definition graph, forwarded verbatim to
    /// the rendering server. Never interpreted beyond counting nodes
    /// for logging.
    pub workflow: serde_json::Value,
    /// Images the workflow references by name.
    #[serde(default)]
    pub images: Vec<InputImage>,
}

/// A caller-supplied image, base64-encoded.
#[derive(Debug, Clone, Deserialize)]
pub struct InputImage {
    /// Filename the workflow graph uses to reference this image.
    pub name: String,
    /// Base64-encoded image bytes (standard alphabet).
    pub image: String,
}

/// Failure to decode a caller-supplied base64 payload.
#[derive(Debug, thiserror::Error)]
#[error("invalid base64 payload for input image '{name}': {source}")]
pub struct ImageDecodeError {
    pub name: String,
    #[source]
    pub source: base64::DecodeError,
}

impl InputImage {
    /// Decode the base64 payload into a raw [`Artifact`].
    pub fn decode(&self) -> Result<Artifact, ImageDecodeError> {
        let bytes = BASE64
            .decode(&self.image)
            .map_err(|source| ImageDecodeError {
                name: self.name.clone(),
                source,
            })?;
        Ok(Artifact::new(self.name.clone(), bytes))
    }
}

/// A rendered image in the output contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputImage {
    /// Output filename as reported by the rendering server.
    pub name: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl OutputImage {
    pub fn from_artifact(artifact: &Artifact) -> Self {
        Self {
            name: artifact.name.clone(),
            data: BASE64.encode(&artifact.bytes),
        }
    }
}

/// Result payload of one job invocation.
///
/// Serializes to exactly one of the two contract shapes:
/// `{"images": [...]}` or `{"error": "<message>"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum JobOutput {
    Images { images: Vec<OutputImage> },
    Error { error: String },
}

impl JobOutput {
    /// Encode collected artifacts into the output contract.
    ///
    /// An empty collection maps to the distinguished
    /// [`NO_IMAGES_ERROR`] outcome.
    pub fn from_artifacts(artifacts: &[Artifact]) -> Self {
        if artifacts.is_empty() {
            return Self::error(NO_IMAGES_ERROR);
        }
        Self::Images {
            images: artifacts.iter().map(OutputImage::from_artifact).collect(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}
