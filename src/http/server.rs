//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (CORS, instrumentation, error classification)
//! - Bind the server to a listener and serve until shutdown
//!
//! # Layer order (outermost first)
//! ```text
//! TraceLayer → CORS → instrumentation → error classification → handlers
//! ```
//! Instrumentation sits outside classification so that every failure,
//! including a dispatch deadline, is metered and logged exactly once.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::middleware as axum_middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::{CorsConfig, Settings};
use crate::errors::handler::handle_errors;
use crate::errors::{MonitoringError, MonitoringResult};
use crate::http::middleware::instrument;
use crate::observability::logging::LoggerHub;
use crate::observability::metrics::AppMetrics;

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub metrics: Arc<AppMetrics>,
    pub loggers: Arc<LoggerHub>,
}

/// HTTP server for the monitoring API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with freshly initialized observability.
    pub fn new(settings: Settings) -> MonitoringResult<Self> {
        let metrics = Arc::new(AppMetrics::new()?);
        let loggers = Arc::new(LoggerHub::from_settings(&settings.logging));
        Self::with_observability(settings, metrics, loggers)
    }

    /// Create a server around externally constructed observability
    /// singletons. Tests inject isolated instances here.
    pub fn with_observability(
        settings: Settings,
        metrics: Arc<AppMetrics>,
        loggers: Arc<LoggerHub>,
    ) -> MonitoringResult<Self> {
        let state = AppState {
            settings: Arc::new(settings),
            metrics,
            loggers,
        };
        let router = Self::build_router(state)?;
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> MonitoringResult<Router> {
        let api_v1 = Router::new()
            .nest("/health", api::health::router())
            .nest("/metrics", api::metrics::router())
            .nest("/dashboard", api::dashboard::router())
            .merge(api::webhook::router());

        let prefix = state.settings.service.api_v1_prefix.clone();
        let cors = cors_layer(&state.settings.cors)?;

        Ok(Router::new()
            .route("/", get(api::health::root))
            .route("/health", get(api::health::service_health))
            .nest(&prefix, api_v1)
            .layer(axum_middleware::from_fn_with_state(
                state.clone(),
                handle_errors,
            ))
            .layer(axum_middleware::from_fn_with_state(state.clone(), instrument))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> MonitoringResult<CorsLayer> {
    let mut origins: Vec<HeaderValue> = Vec::with_capacity(config.allowed_origins.len());
    for origin in &config.allowed_origins {
        let value = origin.parse::<HeaderValue>().map_err(|_| {
            MonitoringError::configuration(
                format!("Invalid CORS origin: {}", origin),
                "cors.allowed_origins",
            )
        })?;
        origins.push(value);
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_server() -> HttpServer {
        let metrics = Arc::new(AppMetrics::new().unwrap());
        let loggers = Arc::new(LoggerHub::new(Vec::new()));
        HttpServer::with_observability(Settings::default(), metrics, loggers).unwrap()
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        let config = CorsConfig {
            allowed_origins: vec!["not a header\nvalue".to_string()],
        };
        let err = cors_layer(&config).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_router_serves_health_route() {
        let server = test_server();
        let response = server
            .router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_router_mounts_versioned_prefix() {
        let server = test_server();
        let response = server
            .router
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}
