//! Configuration schema definitions.
//!
//! This module defines the complete settings structure for the monitoring
//! API. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root settings for the monitoring API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Service identity (name, version, API prefix).
    pub service: ServiceConfig,

    /// Listener configuration (bind address, timeouts).
    pub listener: ListenerConfig,

    /// CORS settings for the dashboard frontend.
    pub cors: CorsConfig,

    /// Structured logging destinations.
    pub logging: LoggingConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Human-readable project name.
    pub project_name: String,

    /// Service version reported by the root endpoint.
    pub version: String,

    /// Prefix under which versioned API routes are mounted.
    pub api_v1_prefix: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            project_name: "Monitoring Platform".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_v1_prefix: "/api/v1".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Per-request dispatch deadline in seconds. A dispatch exceeding the
    /// deadline is recorded as a timeout failure, never silently dropped.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

/// Structured logging configuration.
///
/// Each destination carries its own minimum severity; see
/// `observability::logging` for routing semantics.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for log files; created at startup if absent.
    pub dir: String,

    /// Minimum severity for the console destination.
    pub console_level: String,

    /// Minimum severity for the general application log file.
    pub file_level: String,

    /// Minimum severity for the error-only log file.
    pub error_file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            console_level: "info".to_string(),
            file_level: "debug".to_string(),
            error_file_level: "error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.service.api_v1_prefix, "/api/v1");
        assert_eq!(settings.listener.bind_address, "0.0.0.0:8000");
        assert_eq!(settings.logging.dir, "logs");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let settings: Settings = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"
            "#,
        )
        .unwrap();
        assert_eq!(settings.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(settings.listener.request_timeout_secs, 30);
        assert_eq!(settings.service.project_name, "Monitoring Platform");
    }
}
