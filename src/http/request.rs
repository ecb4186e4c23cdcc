//! Per-request context capture.
//!
//! # Responsibilities
//! - Generate a unique request correlation ID (UUID v4)
//! - Capture dispatch-relevant request attributes up front
//!
//! # Design Decisions
//! - The context lives on the middleware stack for exactly one request;
//!   it is never stored beyond the response

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::http::header;
use uuid::Uuid;

/// Correlation header echoed back on every response.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Transient per-request context, created at dispatch entry.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub start: Instant,
    pub request_id: Uuid,
    pub method: String,
    pub path: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Capture the context for an inbound request.
    pub fn capture(request: &Request) -> Self {
        Self {
            start: Instant::now(),
            request_id: Uuid::new_v4(),
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            client_ip: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string()),
            user_agent: request
                .headers()
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }

    /// Seconds elapsed since dispatch entry.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
