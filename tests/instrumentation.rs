//! Instrumentation pipeline tests: per-request metrics, error
//! classification, and the exactly-once success/failure guarantee.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use monitoring_api::config::Settings;
use monitoring_api::errors::handler::handle_errors;
use monitoring_api::http::server::AppState;
use monitoring_api::observability::logging::LoggerHub;
use monitoring_api::observability::metrics::AppMetrics;
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_success_path_records_exactly_one_increment() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);

    assert_eq!(metrics.request_count.value(&["GET", "/health", "200"]), 1.0);
    assert_eq!(metrics.request_duration.count(), 1);
    // Success and failure paths are mutually exclusive.
    assert!(!metrics
        .registry
        .export()
        .contains("http_request_errors_total{method=\"GET\",endpoint=\"/health\""));
}

#[tokio::test]
async fn test_validation_failure_renders_envelope_and_error_metric() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    // Alert without the required severity label.
    let res = client
        .post(format!("http://{}/api/v1/webhook", addr))
        .json(&json!({"alerts": [{"labels": {"alertname": "HighCpu"}}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["missing_fields"], json!(["severity"]));
    assert!(chrono::DateTime::parse_from_rfc3339(body["error"]["timestamp"].as_str().unwrap()).is_ok());

    assert_eq!(
        metrics
            .error_count
            .value(&["POST", "/api/v1/webhook", "ValidationError"]),
        1.0
    );
    // The failed request must not also count as a success.
    assert_eq!(
        metrics
            .request_count
            .value(&["POST", "/api/v1/webhook", "500"]),
        0.0
    );
}

#[tokio::test]
async fn test_malformed_body_is_classified_as_client_error() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/v1/webhook", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "HTTP_400");

    assert_eq!(
        metrics
            .error_count
            .value(&["POST", "/api/v1/webhook", "HTTP_400"]),
        1.0
    );
}

#[tokio::test]
async fn test_responses_carry_request_id_header() {
    let (addr, _) = common::start_server(Settings::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();
    let request_id = res.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
async fn test_dispatch_deadline_surfaces_as_timeout_failure() {
    let mut settings = Settings::default();
    settings.listener.request_timeout_secs = 1;

    let metrics = Arc::new(AppMetrics::new().unwrap());
    let loggers = Arc::new(LoggerHub::new(Vec::new()));
    let state = AppState {
        settings: Arc::new(settings),
        metrics: metrics.clone(),
        loggers,
    };

    // Same layer stack as the real server, plus a deliberately slow route.
    let app = Router::new()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "done"
            }),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            handle_errors,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            monitoring_api::http::middleware::instrument,
        ))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let res = common::client()
        .get(format!("http://{}/slow", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 504);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "HTTP_504");

    assert_eq!(metrics.error_count.value(&["GET", "/slow", "timeout"]), 1.0);
    assert_eq!(metrics.request_duration.count(), 0);
}

#[tokio::test]
async fn test_cancelled_dispatch_records_failure_kind() {
    let metrics = Arc::new(AppMetrics::new().unwrap());
    let loggers = Arc::new(LoggerHub::new(Vec::new()));
    let state = AppState {
        settings: Arc::new(Settings::default()),
        metrics: metrics.clone(),
        loggers,
    };

    let app = Router::new()
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "done"
            }),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            handle_errors,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            monitoring_api::http::middleware::instrument,
        ))
        .with_state(state);

    // Drop the dispatch mid-flight, as hyper does when the client goes away.
    let task = tokio::spawn(async move {
        let request = axum::http::Request::builder()
            .uri("/slow")
            .body(axum::body::Body::empty())
            .unwrap();
        let _ = app.oneshot(request).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    assert_eq!(metrics.error_count.value(&["GET", "/slow", "cancelled"]), 1.0);
    // The cancelled request must not also count as a success.
    assert_eq!(metrics.request_count.value(&["GET", "/slow", "200"]), 0.0);
    assert_eq!(metrics.request_duration.count(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_all_counted() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let client = client.clone();
        let url = format!("http://{}/health", addr);
        handles.push(tokio::spawn(async move {
            client.get(url).send().await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 200);
    }

    assert_eq!(metrics.request_count.value(&["GET", "/health", "200"]), 20.0);
    assert_eq!(metrics.request_duration.count(), 20);
}
