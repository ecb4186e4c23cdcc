//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, routes, layers)
//!     → middleware.rs (instrument dispatch: timer, logs, metrics)
//!     → request.rs (per-request context, correlation ID)
//!     → handlers (api::*)
//!     → errors::handler (classify + render failures)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
