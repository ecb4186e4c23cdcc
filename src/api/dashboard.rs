//! Dashboard summary endpoint.
//!
//! Serves a mock metrics payload for the frontend; real aggregation is a
//! collaborator concern, not part of this service.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(dashboard_metrics))
}

async fn dashboard_metrics(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.metrics.user_registrations.increment(&[], 5.0)?;
    state.metrics.api_calls.inc(&["dashboard", "/metrics"])?;

    Ok(Json(json!({
        "system_metrics": {
            "cpu_usage": 45.2,
            "memory_usage": 67.8,
            "disk_usage": 23.1,
            "network_io": 125.5,
        },
        "application_metrics": {
            "request_rate": 150.5,
            "response_time_p95": 0.25,
            "error_rate": 0.02,
            "active_users": 1250,
        },
        "business_metrics": {
            "total_users": 5420,
            "daily_active_users": 1250,
            "revenue_today": 12500.50,
            "conversion_rate": 3.2,
        },
    })))
}
