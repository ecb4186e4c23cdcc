//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::http::server::AppState;

/// Content type of the text exposition format.
pub const CONTENT_TYPE_LATEST: &str = "text/plain; version=0.0.4";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(export_metrics))
}

/// Read-only export of every registered metric.
async fn export_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, CONTENT_TYPE_LATEST)],
        state.metrics.registry.export(),
    )
}
