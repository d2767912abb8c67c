//! Ingress route tests (no ComfyUI, no GPU -- contract surface only).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use rendergate_comfyui::readiness::ReadinessConfig;
use rendergate_worker::config::WorkerConfig;
use rendergate_worker::routes::{router, AppState};

fn test_state() -> AppState {
    // Points at a dead port with a tiny readiness budget so job
    // attempts fail fast instead of probing for two minutes.
    AppState {
        config: Arc::new(WorkerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            api_url: "http://127.0.0.1:1".into(),
            ws_url: "ws://127.0.0.1:1".into(),
            input_dir: std::env::temp_dir().join("rendergate-route-tests"),
            readiness: ReadinessConfig {
                max_attempts: 1,
                interval: Duration::from_millis(10),
                probe_timeout: Duration::from_millis(100),
            },
            job_timeout: Some(Duration::from_secs(1)),
        }),
        shutdown: CancellationToken::new(),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = router(test_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn run_answers_the_contract_even_on_failure() {
    let app = router(test_state());
    let request = Request::post("/run")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"workflow": {"1": {}}}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    // Job-level failures still answer HTTP 200 with the error shape.
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn run_rejects_malformed_payloads_at_the_transport_level() {
    let app = router(test_state());
    let request = Request::post("/run")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"no_workflow_here": true}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = router(test_state());
    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
