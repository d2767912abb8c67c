//! Startup readiness probe.
//!
//! The ComfyUI process is expected to come up shortly after the worker
//! does, so the probe is a fixed linear loop (not exponential backoff):
//! a lightweight GET against the base URL with a short per-attempt
//! timeout, retried at a constant interval until the budget runs out.

use std::time::Duration;

/// Probe loop parameters.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub interval: Duration,
    /// Per-attempt request timeout.
    pub probe_timeout: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// The service never became ready within the attempt budget.
#[derive(Debug, thiserror::Error)]
#[error("service at {url} not ready after {attempts} attempts")]
pub struct ReadinessError {
    pub url: String,
    pub attempts: u32,
}

/// Poll `base_url` until it answers with a non-error HTTP response.
///
/// Stops on the first success. Fails only once the full attempt budget
/// is exhausted.
pub async fn wait_until_ready(
    client: &reqwest::Client,
    base_url: &str,
    config: &ReadinessConfig,
) -> Result<(), ReadinessError> {
    for attempt in 1..=config.max_attempts {
        let probe = client
            .get(base_url)
            .timeout(config.probe_timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match probe {
            Ok(_) => {
                tracing::info!(url = %base_url, attempt, "service ready");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(url = %base_url, attempt, error = %e, "service not ready yet");
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    Err(ReadinessError {
        url: base_url.to_string(),
        attempts: config.max_attempts,
    })
}
