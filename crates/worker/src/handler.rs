//! Job handling: contract in, contract out.
//!
//! Every failure mode maps to the contract's `{"error": ...}` shape --
//! the hosting framework gets a JSON outcome either way, never a
//! transport-level error for a job-level problem.

use tokio_util::sync::CancellationToken;

use rendergate_comfyui::executor::JobExecutor;
use rendergate_core::job::{JobInput, JobOutput};
use rendergate_core::types::Artifact;

use crate::config::WorkerConfig;

/// Run one job end to end.
///
/// A fresh [`JobExecutor`] -- and with it a fresh push-channel identity --
/// is created per job, so concurrent invocations never share state.
pub async fn handle_job(
    config: &WorkerConfig,
    shutdown: &CancellationToken,
    job: JobInput,
) -> JobOutput {
    let mut inputs: Vec<Artifact> = Vec::with_capacity(job.images.len());
    for image in &job.images {
        match image.decode() {
            Ok(artifact) => inputs.push(artifact),
            Err(e) => {
                tracing::warn!(error = %e, "rejecting job with undecodable input image");
                return JobOutput::error(e.to_string());
            }
        }
    }

    let executor = JobExecutor::new(config.executor_config());
    match executor.run(&job.workflow, &inputs, shutdown).await {
        Ok(artifacts) => JobOutput::from_artifacts(&artifacts),
        Err(e) => {
            tracing::error!(error = %e, "job failed");
            JobOutput::error(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use rendergate_comfyui::readiness::ReadinessConfig;
    use rendergate_core::job::InputImage;

    fn test_config(api_port: u16) -> WorkerConfig {
        WorkerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            api_url: format!("http://127.0.0.1:{api_port}"),
            ws_url: format!("ws://127.0.0.1:{api_port}"),
            input_dir: std::env::temp_dir().join("rendergate-handler-tests"),
            readiness: ReadinessConfig {
                max_attempts: 2,
                interval: Duration::from_millis(10),
                probe_timeout: Duration::from_millis(200),
            },
            job_timeout: Some(Duration::from_secs(1)),
        }
    }

    #[tokio::test]
    async fn undecodable_input_image_fails_the_job() {
        let job = JobInput {
            workflow: serde_json::json!({"1": {}}),
            images: vec![InputImage {
                name: "in.png".into(),
                image: "///not-base64///".into(),
            }],
        };

        let output = test_job(job).await;
        let json = serde_json::to_value(output).unwrap();
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("in.png"), "unexpected error: {error}");
    }

    #[tokio::test]
    async fn unreachable_service_surfaces_as_error_outcome() {
        let job = JobInput {
            workflow: serde_json::json!({"1": {}}),
            images: vec![],
        };

        let output = test_job(job).await;
        let json = serde_json::to_value(output).unwrap();
        assert!(json["error"].as_str().unwrap().contains("unavailable"));
    }

    async fn test_job(job: JobInput) -> JobOutput {
        // Reserve a port and free it so nothing answers there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        handle_job(&test_config(port), &CancellationToken::new(), job).await
    }
}
