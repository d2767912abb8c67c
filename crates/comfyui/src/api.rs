//! REST client for the ComfyUI HTTP endpoints.
//!
//! Covers the three calls this bridge makes over plain HTTP: workflow
//! submission (`POST /prompt`), history retrieval
//! (`GET /history/{prompt_id}`), and artifact download (`GET /view`).

use std::collections::HashMap;

use serde::Deserialize;

use crate::history::{HistoryRecord, ImageRef};

/// HTTP client for a single ComfyUI server.
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response of a successful `POST /prompt`.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier correlating the queued prompt with
    /// push notifications and the history record.
    pub prompt_id: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure (refused, DNS, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("ComfyUI returned {status} from {endpoint}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The response decoded, but not into the expected shape.
    #[error("malformed response from {endpoint}: {reason}")]
    Malformed {
        endpoint: &'static str,
        reason: String,
    },
}

impl ComfyUIApi {
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Build on an existing [`reqwest::Client`] so the connection pool
    /// is shared with the readiness probe.
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self { client, api_url }
    }

    /// Queue a workflow for execution.
    ///
    /// The body is `{"prompt": <workflow>, "client_id": "<id>"}`; the
    /// `client_id` scopes push notifications to the submitting client.
    pub async fn submit_workflow(
        &self,
        workflow: &serde_json::Value,
        client_id: &str,
    ) -> Result<SubmitResponse, ApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;
        let response = Self::ensure_success(response, "/prompt").await?;

        let submit: SubmitResponse = response.json().await?;
        if submit.prompt_id.is_empty() {
            return Err(ApiError::Malformed {
                endpoint: "/prompt",
                reason: "empty prompt_id".into(),
            });
        }
        Ok(submit)
    }

    /// Fetch the completion record for a prompt.
    ///
    /// The endpoint responds with a map keyed by prompt id; `None`
    /// means the id is absent (never completed, or evicted from the
    /// server-side history).
    pub async fn get_history(&self, prompt_id: &str) -> Result<Option<HistoryRecord>, ApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?;
        let response = Self::ensure_success(response, "/history").await?;

        let mut records: HashMap<String, HistoryRecord> = response.json().await?;
        Ok(records.remove(prompt_id))
    }

    /// Download one artifact by its three-part coordinate.
    pub async fn fetch_artifact(&self, image: &ImageRef) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(format!("{}/view", self.api_url))
            .query(&[
                ("filename", image.filename.as_str()),
                ("subfolder", image.subfolder.as_str()),
                ("type", image.kind.as_str()),
            ])
            .send()
            .await?;
        let response = Self::ensure_success(response, "/view").await?;

        Ok(response.bytes().await?.to_vec())
    }

    async fn ensure_success(
        response: reqwest::Response,
        endpoint: &'static str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
