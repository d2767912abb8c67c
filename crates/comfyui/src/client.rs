//! WebSocket dialer for the ComfyUI push channel.

use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

/// A live push-channel connection.
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Push-channel client for one ComfyUI server.
///
/// The client identity is generated once at construction and lives as
/// long as this instance -- it scopes the server's event multiplexing,
/// so two concurrent executors never share one.
pub struct ComfyUIClient {
    ws_url: String,
    client_id: String,
}

/// Failure to establish the push-channel connection.
#[derive(Debug, thiserror::Error)]
#[error("failed to connect to push channel at {url}: {source}")]
pub struct ConnectError {
    pub url: String,
    #[source]
    pub source: tungstenite::Error,
}

impl ComfyUIClient {
    /// Create a client for `ws_url` (e.g. `ws://host:8188`) with a
    /// fresh UUID v4 identity.
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url,
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// The identity sent both on the WebSocket handshake and with
    /// workflow submissions.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Dial `{ws_url}/ws?clientId={client_id}`.
    pub async fn connect(&self) -> Result<WsStream, ConnectError> {
        let url = format!("{}/ws?clientId={}", self.ws_url, self.client_id);

        let (ws_stream, _response) =
            connect_async(&url).await.map_err(|source| ConnectError {
                url: url.clone(),
                source,
            })?;

        tracing::info!(client_id = %self.client_id, url = %self.ws_url, "push channel connected");
        Ok(ws_stream)
    }
}
