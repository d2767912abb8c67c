use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rendergate_worker::config::WorkerConfig;
use rendergate_worker::gpu;
use rendergate_worker::routes::{router, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rendergate_worker=info,rendergate_comfyui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // No accelerator is a fatal startup condition, not a per-job error.
    if let Err(e) = gpu::assert_gpu_available() {
        tracing::error!(error = %e, "accelerator check failed, refusing to start");
        std::process::exit(1);
    }

    let config = WorkerConfig::from_env();
    tracing::info!(
        api_url = %config.api_url,
        input_dir = %config.input_dir.display(),
        "loaded worker configuration",
    );

    tokio::fs::create_dir_all(&config.input_dir)
        .await
        .expect("failed to create input directory");

    let shutdown = CancellationToken::new();
    let state = AppState {
        config: Arc::new(config.clone()),
        shutdown: shutdown.clone(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind ingress listener");
    tracing::info!(%addr, "worker listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install ctrl-c handler");
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        })
        .await
        .expect("ingress server failed");
}
