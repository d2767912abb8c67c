//! HTTP ingress for the job-invocation contract.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use rendergate_core::job::{JobInput, JobOutput};

use crate::config::WorkerConfig;
use crate::handler::handle_job;

/// Shared ingress state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WorkerConfig>,
    /// Cancelled when the process is shutting down; threaded into
    /// in-flight completion waits.
    pub shutdown: CancellationToken,
}

/// Build the worker router: liveness plus the single job endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/run", post(run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run one job synchronously.
///
/// Both outcome shapes of the contract answer with HTTP 200 -- the
/// `error` field is job-level, not transport-level.
async fn run(State(state): State<AppState>, Json(job): Json<JobInput>) -> Json<JobOutput> {
    Json(handle_job(&state.config, &state.shutdown, job).await)
}
