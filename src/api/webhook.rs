//! Alertmanager webhook intake.
//!
//! Validates the notification payload, records the call, and logs each
//! alert through the structured logger. Forwarding to external systems
//! (chat, ticketing, paging) is a collaborator concern.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use crate::errors::{validate_required_fields, ApiError};
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(alertmanager_webhook))
        .route("/webhook/health", get(webhook_health))
}

async fn alertmanager_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::Http {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let logger = state.loggers.get("webhook");

    let body = body.as_object().cloned().unwrap_or_default();
    validate_required_fields(&body, &["alerts"])?;

    let alerts = body["alerts"].as_array().cloned().unwrap_or_default();
    for alert in &alerts {
        let labels: Map<String, Value> = alert
            .get("labels")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        validate_required_fields(&labels, &["alertname", "severity"])?;

        let alert_name = labels["alertname"].as_str().unwrap_or("unknown");
        let severity = labels["severity"].as_str().unwrap_or("unknown");
        let status = alert.get("status").and_then(Value::as_str).unwrap_or("unknown");
        let summary = alert
            .pointer("/annotations/summary")
            .and_then(Value::as_str)
            .unwrap_or(status);

        state.metrics.api_calls.inc(&["webhook", "/webhook"])?;

        logger.log_alert(
            alert_name,
            severity,
            summary,
            crate::fields! { "alert_status" => status },
        );

        if severity == "critical" && status == "firing" {
            logger.critical(
                &format!("CRITICAL ALERT: {}", alert_name),
                crate::fields! { "alert_name" => alert_name },
            );
        }
    }

    Ok(Json(json!({"status": "success", "message": "Webhook processed"})))
}

async fn webhook_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "webhook"}))
}
