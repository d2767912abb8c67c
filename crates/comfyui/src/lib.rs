//! ComfyUI execution-tracking client.
//!
//! Drives one rendering job end to end: waits for the server to come
//! up, submits a workflow over HTTP, follows the WebSocket event stream
//! until the prompt finishes, then resolves the history record into raw
//! image bytes.

pub mod api;
pub mod client;
pub mod executor;
pub mod history;
pub mod messages;
pub mod readiness;
pub mod tracker;
