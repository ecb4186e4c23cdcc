//! Liveness and readiness endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Root endpoint: service identity.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("{} API", state.settings.service.project_name),
        "version": state.settings.service.version,
    }))
}

/// Unversioned health check.
pub async fn service_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "monitoring-api"}))
}

/// Versioned health check; bumps the connection gauge.
async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.metrics.active_connections.add(&[], 1.0)?;
    Ok(Json(json!({
        "status": "healthy",
        "service": "monitoring-api",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })))
}

async fn readiness_check() -> Json<Value> {
    Json(json!({"status": "ready"}))
}

async fn liveness_check() -> Json<Value> {
    Json(json!({"status": "alive"}))
}
