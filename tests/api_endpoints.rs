//! API surface tests: health, metrics export, dashboard, webhook.

use monitoring_api::config::Settings;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_root_and_health_endpoints() {
    let (addr, _) = common::start_server(Settings::default()).await;
    let client = common::client();

    let body: serde_json::Value = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "Monitoring Platform API");
    assert!(body["version"].is_string());

    let body: serde_json::Value = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "monitoring-api");
}

#[tokio::test]
async fn test_versioned_health_bumps_connection_gauge() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client
            .get(format!("http://{}/api/v1/health/", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);
    }
    assert_eq!(metrics.active_connections.value(&[]), 3.0);

    let ready: serde_json::Value = client
        .get(format!("http://{}/api/v1/health/ready", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ready["status"], "ready");

    let live: serde_json::Value = client
        .get(format!("http://{}/api/v1/health/live", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(live["status"], "alive");
}

#[tokio::test]
async fn test_metrics_export_format_and_content_type() {
    let (addr, _) = common::start_server(Settings::default()).await;
    let client = common::client();

    // Generate one request so a labeled series exists.
    client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("http://{}/api/v1/metrics/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(
        res.headers().get("content-type").unwrap().to_str().unwrap(),
        "text/plain; version=0.0.4"
    );

    let text = res.text().await.unwrap();
    assert!(text.contains("# HELP http_requests_total Total HTTP requests"));
    assert!(text.contains("# TYPE http_requests_total counter"));
    assert!(text
        .contains("http_requests_total{method=\"GET\",endpoint=\"/health\",status=\"200\"} 1"));
    assert!(text.contains("# TYPE http_request_duration_seconds histogram"));
    assert!(text.contains("http_request_duration_seconds_count 1"));
}

#[tokio::test]
async fn test_dashboard_metrics_payload_and_counters() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    let body: serde_json::Value = client
        .get(format!("http://{}/api/v1/dashboard/metrics", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["system_metrics"]["cpu_usage"], 45.2);
    assert_eq!(body["application_metrics"]["active_users"], 1250);
    assert_eq!(metrics.user_registrations.value(&[]), 5.0);
    assert_eq!(metrics.api_calls.value(&["dashboard", "/metrics"]), 1.0);
}

#[tokio::test]
async fn test_webhook_processes_alert_batch() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    let payload = json!({
        "alerts": [
            {
                "status": "firing",
                "labels": {"alertname": "HighCpu", "severity": "critical"},
                "annotations": {"summary": "CPU above 95%"}
            },
            {
                "status": "resolved",
                "labels": {"alertname": "DiskFull", "severity": "warning"}
            }
        ]
    });

    let res = client
        .post(format!("http://{}/api/v1/webhook", addr))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["message"], "Webhook processed");
    assert_eq!(metrics.api_calls.value(&["webhook", "/webhook"]), 2.0);
}

#[tokio::test]
async fn test_webhook_requires_alerts_field() {
    let (addr, _) = common::start_server(Settings::default()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/v1/webhook", addr))
        .json(&json!({"status": "firing"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"]["missing_fields"], json!(["alerts"]));
}

#[tokio::test]
async fn test_webhook_health() {
    let (addr, _) = common::start_server(Settings::default()).await;
    let client = common::client();

    let body: serde_json::Value = client
        .get(format!("http://{}/api/v1/webhook/health", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["service"], "webhook");
}

#[tokio::test]
async fn test_unknown_route_is_plain_404() {
    let (addr, metrics) = common::start_server(Settings::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/nope", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    // Router fallbacks are successful dispatches, not failures.
    assert_eq!(metrics.request_count.value(&["GET", "/nope", "404"]), 1.0);
}
