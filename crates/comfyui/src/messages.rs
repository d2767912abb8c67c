//! Typed view of the ComfyUI WebSocket event stream.
//!
//! The server pushes JSON envelopes of the shape
//! `{"type": "<kind>", "data": {...}}`. Known kinds deserialize into
//! [`ComfyUIMessage`] via serde's internally-tagged representation;
//! envelopes with an unrecognized kind are surfaced as
//! [`ParsedFrame::Unknown`] so the receive loop can skip them without
//! treating new server-side message types as protocol errors.

use serde::Deserialize;

/// Known ComfyUI event kinds, tagged by the envelope `"type"` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ComfyUIMessage {
    /// Periodic queue-state broadcast.
    #[serde(rename = "status")]
    Status(StatusData),

    /// A prompt left the queue and started executing.
    #[serde(rename = "execution_start")]
    ExecutionStart(ExecutionStartData),

    /// Nodes whose outputs were served from the server-side cache.
    #[serde(rename = "execution_cached")]
    ExecutionCached(ExecutionCachedData),

    /// Node-level execution progress. `node: null` is the terminal
    /// signal: every node of the prompt has finished.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    /// Step progress inside a long-running node.
    #[serde(rename = "progress")]
    Progress(ProgressData),

    /// A node finished and produced output.
    #[serde(rename = "executed")]
    Executed(ExecutedData),

    /// The prompt failed inside a node.
    #[serde(rename = "execution_error")]
    ExecutionError(ExecutionErrorData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub status: QueueInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueInfo {
    pub exec_info: ExecCounts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecCounts {
    pub queue_remaining: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStartData {
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionCachedData {
    pub prompt_id: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Payload of `executing` events.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    /// Node currently running, or `None` once the prompt is done.
    pub node: Option<String>,
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    pub value: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutedData {
    pub node: String,
    pub prompt_id: String,
    /// Per-node output listing (filenames etc.); not consumed here --
    /// outputs are resolved from the history record after completion.
    pub output: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionErrorData {
    pub prompt_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    pub exception_message: String,
    pub exception_type: String,
}

/// Outcome of parsing one text frame off the push channel.
#[derive(Debug)]
pub enum ParsedFrame {
    /// A known event kind with a well-formed payload.
    Known(ComfyUIMessage),
    /// A valid envelope whose kind is unrecognized or whose payload did
    /// not match the expected shape. Ignored by the receive loop.
    Unknown { kind: String },
}

/// Minimal envelope used to salvage the kind of frames that do not
/// deserialize into [`ComfyUIMessage`].
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Parse one text frame.
///
/// Returns `Err` only for frames that are not event envelopes at all
/// (malformed JSON, or no string `"type"` field) -- those count as
/// protocol corruption upstream. Envelopes that merely carry an
/// unexpected kind or payload shape come back as
/// [`ParsedFrame::Unknown`].
pub fn parse_frame(text: &str) -> Result<ParsedFrame, serde_json::Error> {
    match serde_json::from_str::<ComfyUIMessage>(text) {
        Ok(msg) => Ok(ParsedFrame::Known(msg)),
        Err(err) => match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => Ok(ParsedFrame::Unknown {
                kind: envelope.kind,
            }),
            Err(_) => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parse_known(text: &str) -> ComfyUIMessage {
        match parse_frame(text).unwrap() {
            ParsedFrame::Known(msg) => msg,
            other => panic!("expected a known message, got {other:?}"),
        }
    }

    #[test]
    fn parses_status() {
        let msg = parse_known(
            r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":2}}}}"#,
        );
        assert_matches!(msg, ComfyUIMessage::Status(data) => {
            assert_eq!(data.status.exec_info.queue_remaining, 2);
        });
    }

    #[test]
    fn parses_execution_start() {
        let msg = parse_known(r#"{"type":"execution_start","data":{"prompt_id":"p-1"}}"#);
        assert_matches!(msg, ComfyUIMessage::ExecutionStart(data) => {
            assert_eq!(data.prompt_id, "p-1");
        });
    }

    #[test]
    fn parses_execution_cached_with_and_without_nodes() {
        let msg =
            parse_known(r#"{"type":"execution_cached","data":{"prompt_id":"p","nodes":["4"]}}"#);
        assert_matches!(msg, ComfyUIMessage::ExecutionCached(data) => {
            assert_eq!(data.nodes, vec!["4"]);
        });

        let msg = parse_known(r#"{"type":"execution_cached","data":{"prompt_id":"p"}}"#);
        assert_matches!(msg, ComfyUIMessage::ExecutionCached(data) => {
            assert!(data.nodes.is_empty());
        });
    }

    #[test]
    fn parses_executing_with_node() {
        let msg = parse_known(r#"{"type":"executing","data":{"node":"7","prompt_id":"p"}}"#);
        assert_matches!(msg, ComfyUIMessage::Executing(data) => {
            assert_eq!(data.node.as_deref(), Some("7"));
            assert_eq!(data.prompt_id, "p");
        });
    }

    #[test]
    fn parses_terminal_executing() {
        let msg = parse_known(r#"{"type":"executing","data":{"node":null,"prompt_id":"p"}}"#);
        assert_matches!(msg, ComfyUIMessage::Executing(data) => {
            assert!(data.node.is_none());
        });
    }

    #[test]
    fn parses_progress() {
        let msg = parse_known(r#"{"type":"progress","data":{"value":3,"max":20}}"#);
        assert_matches!(msg, ComfyUIMessage::Progress(data) => {
            assert_eq!((data.value, data.max), (3, 20));
        });
    }

    #[test]
    fn parses_executed_with_output_payload() {
        let msg = parse_known(
            r#"{"type":"executed","data":{"node":"9","prompt_id":"p","output":{"images":[{"filename":"out.png"}]}}}"#,
        );
        assert_matches!(msg, ComfyUIMessage::Executed(data) => {
            assert_eq!(data.node, "9");
            assert!(data.output.is_object());
        });
    }

    #[test]
    fn parses_execution_error() {
        let msg = parse_known(
            r#"{"type":"execution_error","data":{"prompt_id":"p","node_id":"5","exception_message":"OOM","exception_type":"RuntimeError"}}"#,
        );
        assert_matches!(msg, ComfyUIMessage::ExecutionError(data) => {
            assert_eq!(data.node_id.as_deref(), Some("5"));
            assert_eq!(data.exception_message, "OOM");
        });
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let frame = parse_frame(r#"{"type":"crystools.monitor","data":{"cpu":12}}"#).unwrap();
        assert_matches!(frame, ParsedFrame::Unknown { kind } => {
            assert_eq!(kind, "crystools.monitor");
        });
    }

    #[test]
    fn known_kind_with_unexpected_payload_is_skipped() {
        // "executing" without a prompt_id cannot be correlated; it is
        // skipped rather than failing the stream.
        let frame = parse_frame(r#"{"type":"executing","data":{"node":"1"}}"#).unwrap();
        assert_matches!(frame, ParsedFrame::Unknown { kind } => {
            assert_eq!(kind, "executing");
        });
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_frame("not json").is_err());
    }

    #[test]
    fn non_envelope_json_is_an_error() {
        assert!(parse_frame(r#"{"data":{}}"#).is_err());
        assert!(parse_frame(r#"{"type":7,"data":{}}"#).is_err());
    }
}
