//! Worker configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use rendergate_comfyui::executor::ExecutorConfig;
use rendergate_comfyui::readiness::ReadinessConfig;

/// All worker settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bind address for the ingress listener (default: `0.0.0.0`).
    pub host: String,
    /// Bind port for the ingress listener (default: `3000`).
    pub port: u16,
    /// ComfyUI HTTP base URL, derived from `SERVER_ADDRESS`/`COMFYUI_PORT`.
    pub api_url: String,
    /// ComfyUI WebSocket base URL, derived from the same pair.
    pub ws_url: String,
    /// Directory input images are persisted into (default: `/input`).
    pub input_dir: PathBuf,
    /// Readiness probe budget.
    pub readiness: ReadinessConfig,
    /// Optional cap on the completion wait; unset means unbounded (the
    /// hosting framework's outer timeout is trusted).
    pub job_timeout: Option<Duration>,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default     |
    /// |----------------------|-------------|
    /// | `HOST`               | `0.0.0.0`   |
    /// | `PORT`               | `3000`      |
    /// | `SERVER_ADDRESS`     | `127.0.0.1` |
    /// | `COMFYUI_PORT`       | `8188`      |
    /// | `INPUT_DIR`          | `/input`    |
    /// | `READY_MAX_ATTEMPTS` | `120`       |
    /// | `READY_INTERVAL_SECS`| `1`         |
    /// | `JOB_TIMEOUT_SECS`   | unset       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let server_address =
            std::env::var("SERVER_ADDRESS").unwrap_or_else(|_| "127.0.0.1".into());

        let comfyui_port: u16 = std::env::var("COMFYUI_PORT")
            .unwrap_or_else(|_| "8188".into())
            .parse()
            .expect("COMFYUI_PORT must be a valid u16");

        let input_dir =
            PathBuf::from(std::env::var("INPUT_DIR").unwrap_or_else(|_| "/input".into()));

        let mut readiness = ReadinessConfig::default();
        if let Ok(attempts) = std::env::var("READY_MAX_ATTEMPTS") {
            readiness.max_attempts = attempts
                .parse()
                .expect("READY_MAX_ATTEMPTS must be a valid u32");
        }
        if let Ok(secs) = std::env::var("READY_INTERVAL_SECS") {
            readiness.interval = Duration::from_secs(
                secs.parse()
                    .expect("READY_INTERVAL_SECS must be a valid u64"),
            );
        }

        let job_timeout = std::env::var("JOB_TIMEOUT_SECS").ok().map(|secs| {
            Duration::from_secs(secs.parse().expect("JOB_TIMEOUT_SECS must be a valid u64"))
        });

        Self {
            host,
            port,
            api_url: format!("http://{server_address}:{comfyui_port}"),
            ws_url: format!("ws://{server_address}:{comfyui_port}"),
            input_dir,
            readiness,
            job_timeout,
        }
    }

    /// Executor settings for one job run.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            api_url: self.api_url.clone(),
            ws_url: self.ws_url.clone(),
            input_dir: self.input_dir.clone(),
            readiness: self.readiness.clone(),
            job_timeout: self.job_timeout,
        }
    }
}
