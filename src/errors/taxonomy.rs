//! Monitoring error taxonomy and validation helpers.
//!
//! Every known failure mode maps to one variant with a stable error code,
//! a human message, and a structured detail payload. Codes are part of the
//! wire contract; clients match on them programmatically.

use serde_json::{Map, Value};
use thiserror::Error;

/// Structured detail payload attached to an error.
pub type Details = Map<String, Value>;

/// Closed set of failure kinds the monitoring platform can signal.
#[derive(Debug, Clone, Error)]
pub enum MonitoringError {
    /// Metrics collection failed.
    #[error("{message}")]
    MetricsCollection {
        message: String,
        metric_name: Option<String>,
        details: Details,
    },

    /// Database connection failed.
    #[error("{message}")]
    DatabaseConnection { message: String, details: Details },

    /// Prometheus backend connection failed.
    #[error("{message}")]
    PrometheusConnection { message: String, details: Details },

    /// Grafana backend connection failed.
    #[error("{message}")]
    GrafanaConnection { message: String, details: Details },

    /// Alert processing failed.
    #[error("{message}")]
    AlertProcessing {
        message: String,
        alert_id: Option<String>,
        details: Details,
    },

    /// Data validation failed.
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
        details: Details,
    },

    /// Configuration is invalid.
    #[error("{message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
        details: Details,
    },
}

/// Result type for monitoring operations.
pub type MonitoringResult<T> = Result<T, MonitoringError>;

impl MonitoringError {
    /// Stable error code for the wire envelope.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MetricsCollection { .. } => "METRICS_COLLECTION_ERROR",
            Self::DatabaseConnection { .. } => "DATABASE_CONNECTION_ERROR",
            Self::PrometheusConnection { .. } => "PROMETHEUS_CONNECTION_ERROR",
            Self::GrafanaConnection { .. } => "GRAFANA_CONNECTION_ERROR",
            Self::AlertProcessing { .. } => "ALERT_PROCESSING_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
        }
    }

    /// Failure kind name used as a metrics label.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MetricsCollection { .. } => "MetricsCollectionError",
            Self::DatabaseConnection { .. } => "DatabaseConnectionError",
            Self::PrometheusConnection { .. } => "PrometheusConnectionError",
            Self::GrafanaConnection { .. } => "GrafanaConnectionError",
            Self::AlertProcessing { .. } => "AlertProcessingError",
            Self::Validation { .. } => "ValidationError",
            Self::Configuration { .. } => "ConfigurationError",
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::MetricsCollection { message, .. }
            | Self::DatabaseConnection { message, .. }
            | Self::PrometheusConnection { message, .. }
            | Self::GrafanaConnection { message, .. }
            | Self::AlertProcessing { message, .. }
            | Self::Validation { message, .. }
            | Self::Configuration { message, .. } => message,
        }
    }

    /// Structured detail payload.
    pub fn details(&self) -> &Details {
        match self {
            Self::MetricsCollection { details, .. }
            | Self::DatabaseConnection { details, .. }
            | Self::PrometheusConnection { details, .. }
            | Self::GrafanaConnection { details, .. }
            | Self::AlertProcessing { details, .. }
            | Self::Validation { details, .. }
            | Self::Configuration { details, .. } => details,
        }
    }

    /// Validation failure without field attribution.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
            details: Details::new(),
        }
    }

    /// Validation failure for a specific field.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
            details: Details::new(),
        }
    }

    /// Configuration failure for a specific key.
    pub fn configuration(message: impl Into<String>, config_key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
            details: Details::new(),
        }
    }

    /// Attach a detail entry, consuming and returning self.
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        let details = match &mut self {
            Self::MetricsCollection { details, .. }
            | Self::DatabaseConnection { details, .. }
            | Self::PrometheusConnection { details, .. }
            | Self::GrafanaConnection { details, .. }
            | Self::AlertProcessing { details, .. }
            | Self::Validation { details, .. }
            | Self::Configuration { details, .. } => details,
        };
        details.insert(key.into(), value);
        self
    }
}

/// Check that every required field is present and non-null in `data`.
///
/// Fails with a single `Validation` error listing all missing fields in
/// `details.missing_fields`.
pub fn validate_required_fields(
    data: &Map<String, Value>,
    required_fields: &[&str],
) -> MonitoringResult<()> {
    let missing: Vec<&str> = required_fields
        .iter()
        .filter(|f| matches!(data.get(**f), None | Some(Value::Null)))
        .copied()
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let field = if missing.len() == 1 {
        Some(missing[0].to_string())
    } else {
        None
    };

    Err(MonitoringError::Validation {
        message: format!("Missing required fields: {}", missing.join(", ")),
        field,
        details: {
            let mut d = Details::new();
            d.insert(
                "missing_fields".to_string(),
                Value::Array(missing.iter().map(|f| Value::String(f.to_string())).collect()),
            );
            d
        },
    })
}

/// Validate and convert a metric value to `f64`.
///
/// Accepts non-negative finite numbers (numeric JSON values or numeric
/// strings); rejects everything else with a `Validation` error.
pub fn validate_metric_value(value: &Value, metric_name: &str) -> MonitoringResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(v) if v.is_finite() => Err(MonitoringError::Validation {
            message: format!("Metric value cannot be negative: {}", metric_name),
            field: Some(metric_name.to_string()),
            details: {
                let mut d = Details::new();
                d.insert("value".to_string(), value.clone());
                d.insert("metric_name".to_string(), Value::String(metric_name.to_string()));
                d
            },
        }),
        _ => Err(MonitoringError::Validation {
            message: format!("Invalid metric value: {}", metric_name),
            field: Some(metric_name.to_string()),
            details: {
                let mut d = Details::new();
                d.insert("value".to_string(), value.clone());
                d.insert("metric_name".to_string(), Value::String(metric_name.to_string()));
                d
            },
        }),
    }
}

/// Divide two numbers, returning `default` when the denominator is zero or
/// either operand is not a valid number. Never fails.
pub fn safe_divide(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 || !numerator.is_finite() || !denominator.is_finite() {
        return default;
    }
    numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes_stable() {
        let err = MonitoringError::validation("bad input");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = MonitoringError::configuration("duplicate metric", "http_requests_total");
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert_eq!(err.to_string(), "duplicate metric");
    }

    #[test]
    fn test_validate_required_fields_single_missing() {
        let mut data = Map::new();
        data.insert("alertname".to_string(), json!("HighCpu"));

        let err = validate_required_fields(&data, &["alertname", "severity"]).unwrap_err();
        match &err {
            MonitoringError::Validation { field, details, .. } => {
                assert_eq!(field.as_deref(), Some("severity"));
                assert_eq!(details["missing_fields"], json!(["severity"]));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_required_fields_null_counts_as_missing() {
        let mut data = Map::new();
        data.insert("severity".to_string(), Value::Null);

        let err = validate_required_fields(&data, &["severity"]).unwrap_err();
        assert_eq!(err.details()["missing_fields"], json!(["severity"]));
    }

    #[test]
    fn test_validate_required_fields_multiple_missing_clears_field() {
        let data = Map::new();
        let err = validate_required_fields(&data, &["a", "b"]).unwrap_err();
        match &err {
            MonitoringError::Validation { field, details, .. } => {
                assert!(field.is_none());
                assert_eq!(details["missing_fields"], json!(["a", "b"]));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validate_metric_value() {
        assert_eq!(validate_metric_value(&json!(0), "m").unwrap(), 0.0);
        assert_eq!(validate_metric_value(&json!(2.5), "m").unwrap(), 2.5);
        assert_eq!(validate_metric_value(&json!("42"), "m").unwrap(), 42.0);

        assert!(validate_metric_value(&json!(-1), "m").is_err());
        assert!(validate_metric_value(&json!("not a number"), "m").is_err());
        assert!(validate_metric_value(&json!({"nested": true}), "m").is_err());
        assert!(validate_metric_value(&Value::Null, "m").is_err());
    }

    #[test]
    fn test_safe_divide() {
        assert_eq!(safe_divide(10.0, 2.0, 0.0), 5.0);
        assert_eq!(safe_divide(10.0, 0.0, -1.0), -1.0);
        assert_eq!(safe_divide(f64::NAN, 2.0, 7.0), 7.0);
        assert_eq!(safe_divide(1.0, f64::INFINITY, 3.0), 3.0);
    }
}
