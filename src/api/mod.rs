//! Versioned API route handlers.
//!
//! Thin collaborators over the observability core: each handler returns a
//! small JSON payload and records its activity through the shared metrics
//! and logger handles in [`AppState`](crate::http::AppState).

pub mod dashboard;
pub mod health;
pub mod metrics;
pub mod webhook;
