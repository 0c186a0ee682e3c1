#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use easel_api::config::ServerConfig;
use easel_api::routes;
use easel_api::state::AppState;
use easel_core::registry::ModelRegistry;
use easel_fal::FalClient;
use easel_history::{HistoryStore, StoreLimits};

/// Build a test `ServerConfig` with safe defaults and a tempdir-backed
/// history path. The upstream URLs point at a closed port; tests that
/// need an upstream override them with a mock server's address.
pub fn test_config(dir: &tempfile::TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        fal_key: Some("test-key".to_string()),
        fal_run_base_url: "http://127.0.0.1:9".to_string(),
        fal_rest_base_url: "http://127.0.0.1:9".to_string(),
        history_path: dir.path().join("history.json"),
        history_max_items: 50,
        history_max_bytes: 4_000_000,
    }
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration
/// tests exercise the same middleware stack (CORS, request ID, timeout,
/// tracing, panic recovery) that production uses.
pub async fn build_test_app(config: ServerConfig) -> Router {
    let history = HistoryStore::open(
        &config.history_path,
        StoreLimits {
            max_items: config.history_max_items,
            max_bytes: config.history_max_bytes,
        },
    )
    .await
    .unwrap();

    let state = AppState {
        registry: Arc::new(ModelRegistry::new()),
        fal: Arc::new(FalClient::new(
            config.fal_run_base_url.clone(),
            config.fal_rest_base_url.clone(),
            config.fal_key.clone(),
        )),
        history: Arc::new(history),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .merge(routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// App with no reachable upstream, for routes that never leave the process.
pub async fn offline_app() -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(test_config(&dir)).await;
    (app, dir)
}

/// App whose upstream client points at a mock server.
pub async fn app_with_upstream(upstream: &str) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.fal_run_base_url = upstream.to_string();
    config.fal_rest_base_url = upstream.to_string();
    let app = build_test_app(config).await;
    (app, dir)
}

/// Serve a mock upstream router on an ephemeral port, returning its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

// Request helpers. `oneshot` consumes the service, so callers clone the
// router when a test sends several requests against one app.

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A valid history item in interchange form.
pub fn sample_item(id: &str, hour: u8) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "timestamp": format!("2025-01-15T{hour:02}:00:00Z"),
        "modelId": "fal-ai/flux/dev",
        "modelName": "FLUX.1 [dev]",
        "category": "image-generation",
        "prompt": "a red bicycle",
        "result": { "images": [{ "url": "https://e/a.png" }] }
    })
}
