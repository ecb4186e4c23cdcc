//! Monitoring Platform API library.

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

pub use config::Settings;
pub use errors::{MonitoringError, MonitoringResult};
pub use http::HttpServer;
