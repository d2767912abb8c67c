//! Completion tracking over the push channel.
//!
//! [`await_completion`] blocks on the WebSocket event stream until the
//! server reports that the tracked prompt has finished every node. The
//! terminal signal is an `executing` event with `node == null` and a
//! matching `prompt_id`; everything else on the channel is ignored.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::client::WsStream;
use crate::messages::{parse_frame, ComfyUIMessage, ParsedFrame};

/// Why the completion wait ended without the terminal signal.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The channel closed (or the stream ended) before completion.
    #[error("push channel closed before the job completed")]
    ChannelClosed,

    /// The channel failed at the transport level.
    #[error("push channel error: {0}")]
    Channel(#[from] tungstenite::Error),

    /// A text frame was not an event envelope at all.
    #[error("unparsable event frame: {0}")]
    Protocol(#[source] serde_json::Error),

    /// The optional deadline elapsed.
    #[error("job did not complete within {0:?}")]
    TimedOut(Duration),

    /// The caller cancelled the wait.
    #[error("completion wait cancelled")]
    Cancelled,
}

/// Block until `prompt_id` finishes all work.
///
/// Ignores, and keeps waiting through: events of other kinds, events
/// for other prompt ids, `executing` events still carrying a concrete
/// node id, unknown event kinds, and binary frames (live previews).
/// Returns exactly once, on the first terminal signal.
///
/// With `deadline: None` the wait is unbounded -- the caller is expected
/// to bound total job time externally.
pub async fn await_completion(
    ws: &mut WsStream,
    prompt_id: &str,
    deadline: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), TrackError> {
    let expired = async {
        match deadline {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(expired);

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Err(TrackError::Cancelled),
            _ = &mut expired => {
                // deadline is Some here or `expired` never resolves
                return Err(TrackError::TimedOut(deadline.unwrap_or_default()));
            }
            frame = ws.next() => frame,
        };

        match frame {
            None => return Err(TrackError::ChannelClosed),
            Some(Err(e)) => {
                tracing::error!(prompt_id, error = %e, "push channel receive failed");
                return Err(TrackError::Channel(e));
            }
            Some(Ok(Message::Text(text))) => {
                if handle_text_frame(&text, prompt_id)? {
                    return Ok(());
                }
            }
            Some(Ok(Message::Binary(_))) => {
                // Live preview frames; never inspected.
                tracing::trace!(prompt_id, "ignoring binary frame");
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                tracing::warn!(prompt_id, ?frame, "push channel closed by server");
                return Err(TrackError::ChannelClosed);
            }
            Some(Ok(Message::Frame(_))) => {}
        }
    }
}

/// Returns `Ok(true)` when `text` carries the terminal signal for
/// `prompt_id`.
fn handle_text_frame(text: &str, prompt_id: &str) -> Result<bool, TrackError> {
    let msg = match parse_frame(text).map_err(TrackError::Protocol)? {
        ParsedFrame::Known(msg) => msg,
        ParsedFrame::Unknown { kind } => {
            tracing::trace!(prompt_id, kind = %kind, "ignoring unrecognized event");
            return Ok(false);
        }
    };

    match msg {
        ComfyUIMessage::Executing(data) if data.prompt_id == prompt_id => match data.node {
            None => {
                tracing::info!(prompt_id, "job completed (all nodes done)");
                Ok(true)
            }
            Some(node) => {
                tracing::debug!(prompt_id, node = %node, "executing node");
                Ok(false)
            }
        },
        ComfyUIMessage::Executing(_) => Ok(false),
        ComfyUIMessage::Progress(data) => {
            tracing::debug!(prompt_id, value = data.value, max = data.max, "node progress");
            Ok(false)
        }
        ComfyUIMessage::ExecutionError(data) if data.prompt_id == prompt_id => {
            // The server still emits the terminal `executing` signal
            // after a failed prompt; keep waiting for it.
            tracing::warn!(
                prompt_id,
                node_id = ?data.node_id,
                error_type = %data.exception_type,
                error_message = %data.exception_message,
                "prompt reported an execution error",
            );
            Ok(false)
        }
        ComfyUIMessage::Status(data) => {
            tracing::debug!(
                prompt_id,
                queue_remaining = data.status.exec_info.queue_remaining,
                "queue status",
            );
            Ok(false)
        }
        ComfyUIMessage::ExecutionStart(_)
        | ComfyUIMessage::ExecutionCached(_)
        | ComfyUIMessage::Executed(_)
        | ComfyUIMessage::ExecutionError(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_signal_requires_matching_id_and_null_node() {
        let ours = r#"{"type":"executing","data":{"node":null,"prompt_id":"p-1"}}"#;
        let theirs = r#"{"type":"executing","data":{"node":null,"prompt_id":"p-2"}}"#;
        let in_progress = r#"{"type":"executing","data":{"node":"3","prompt_id":"p-1"}}"#;

        assert!(handle_text_frame(ours, "p-1").unwrap());
        assert!(!handle_text_frame(theirs, "p-1").unwrap());
        assert!(!handle_text_frame(in_progress, "p-1").unwrap());
    }

    #[test]
    fn other_event_kinds_do_not_terminate() {
        for text in [
            r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":0}}}}"#,
            r#"{"type":"execution_start","data":{"prompt_id":"p-1"}}"#,
            r#"{"type":"progress","data":{"value":1,"max":2}}"#,
            r#"{"type":"executed","data":{"node":"9","prompt_id":"p-1","output":{}}}"#,
            r#"{"type":"execution_error","data":{"prompt_id":"p-1","exception_message":"x","exception_type":"E"}}"#,
            r#"{"type":"somebody.elses.extension","data":{}}"#,
        ] {
            assert!(!handle_text_frame(text, "p-1").unwrap(), "{text}");
        }
    }

    #[test]
    fn garbage_frame_is_a_protocol_error() {
        assert!(matches!(
            handle_text_frame("{{{", "p-1"),
            Err(TrackError::Protocol(_))
        ));
    }
}
