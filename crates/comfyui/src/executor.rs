//! Single-job orchestration.
//!
//! [`JobExecutor`] composes the readiness probe, submission, completion
//! tracking, and artifact collection into one run:
//!
//! persist inputs -> wait for readiness -> open push channel -> submit
//! -> await terminal signal -> fetch history -> resolve every artifact.
//!
//! One executor handles one job end to end. Its client identity is
//! created at construction, so concurrent jobs in the same process get
//! independent push-channel scopes.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rendergate_core::types::Artifact;

use crate::api::{ApiError, ComfyUIApi};
use crate::client::{ComfyUIClient, ConnectError};
use crate::readiness::{wait_until_ready, ReadinessConfig, ReadinessError};
use crate::tracker::{await_completion, TrackError};

/// Everything a [`JobExecutor`] needs to reach one ComfyUI server.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// HTTP base URL, e.g. `http://127.0.0.1:8188`.
    pub api_url: String,
    /// WebSocket base URL, e.g. `ws://127.0.0.1:8188`.
    pub ws_url: String,
    /// Directory where input images are persisted so the workflow can
    /// reference them by name.
    pub input_dir: PathBuf,
    pub readiness: ReadinessConfig,
    /// Upper bound on the completion wait. `None` = unbounded, the
    /// hosting framework's outer timeout is trusted instead.
    pub job_timeout: Option<Duration>,
}

/// Orchestrates one rendering job against one ComfyUI server.
pub struct JobExecutor {
    http: reqwest::Client,
    api: ComfyUIApi,
    client: ComfyUIClient,
    config: ExecutorConfig,
}

/// Failure taxonomy of a job run. Nothing here is retried -- only the
/// readiness loop has an internal attempt budget.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("rendering service unavailable: {0}")]
    ServiceUnavailable(#[from] ReadinessError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("workflow submission failed: {0}")]
    Submission(#[source] ApiError),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error("history request failed: {0}")]
    History(#[source] ApiError),

    #[error("no history entry for prompt {0}")]
    HistoryNotFound(String),

    #[error("failed to fetch artifact '{filename}': {source}")]
    Fetch {
        filename: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to persist input image '{name}': {source}")]
    SaveInput {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl JobExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let http = reqwest::Client::new();
        let api = ComfyUIApi::with_client(http.clone(), config.api_url.clone());
        let client = ComfyUIClient::new(config.ws_url.clone());
        Self {
            http,
            api,
            client,
            config,
        }
    }

    /// This executor's push-channel identity.
    pub fn client_id(&self) -> &str {
        self.client.client_id()
    }

    /// Run one job to completion and return every artifact its history
    /// record references.
    ///
    /// An empty result is a valid outcome (the workflow produced no
    /// images); a failed fetch of any single referenced artifact fails
    /// the whole run.
    pub async fn run(
        &self,
        workflow: &serde_json::Value,
        inputs: &[Artifact],
        cancel: &CancellationToken,
    ) -> Result<Vec<Artifact>, ExecuteError> {
        let nodes = workflow.as_object().map_or(0, |graph| graph.len());
        tracing::info!(nodes, inputs = inputs.len(), "job received");

        self.save_inputs(inputs).await?;

        wait_until_ready(&self.http, &self.config.api_url, &self.config.readiness).await?;

        // Connect before submitting so the completion signal cannot
        // slip past between queueing and listening.
        let mut ws = self.client.connect().await?;

        let submit = self
            .api
            .submit_workflow(workflow, self.client.client_id())
            .await
            .map_err(ExecuteError::Submission)?;
        let prompt_id = submit.prompt_id;
        tracing::info!(prompt_id = %prompt_id, "workflow queued");

        await_completion(&mut ws, &prompt_id, self.config.job_timeout, cancel).await?;
        let _ = ws.close(None).await;

        let history = self
            .api
            .get_history(&prompt_id)
            .await
            .map_err(ExecuteError::History)?
            .ok_or_else(|| ExecuteError::HistoryNotFound(prompt_id.clone()))?;

        let mut artifacts = Vec::new();
        for image in history.image_refs() {
            let bytes = self
                .api
                .fetch_artifact(image)
                .await
                .map_err(|source| ExecuteError::Fetch {
                    filename: image.filename.clone(),
                    source,
                })?;
            artifacts.push(Artifact::new(image.filename.clone(), bytes));
        }

        tracing::info!(prompt_id = %prompt_id, count = artifacts.len(), "artifacts collected");
        Ok(artifacts)
    }

    /// Persist input images under their given names, overwriting any
    /// existing file, so the workflow graph can reference them.
    async fn save_inputs(&self, inputs: &[Artifact]) -> Result<(), ExecuteError> {
        if inputs.is_empty() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.config.input_dir)
            .await
            .map_err(|source| ExecuteError::SaveInput {
                name: "<input dir>".into(),
                source,
            })?;

        for input in inputs {
            let path = self.config.input_dir.join(&input.name);
            tokio::fs::write(&path, &input.bytes)
                .await
                .map_err(|source| ExecuteError::SaveInput {
                    name: input.name.clone(),
                    source,
                })?;
            tracing::info!(name = %input.name, path = %path.display(), "input image saved");
        }
        Ok(())
    }
}
