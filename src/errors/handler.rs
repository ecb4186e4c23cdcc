//! Error classification and response mapping.
//!
//! # Data Flow
//! ```text
//! Raised (handler returns Err)
//!     → Classified (taxonomy kind, client error, or unclassified)
//!     → Logged (WARNING for classified, CRITICAL for unclassified)
//!     → Rendered (canonical JSON envelope + status code)
//! ```
//!
//! # Design Decisions
//! - Clients never see raw internal failure text for unclassified
//!   failures; the raw text is logged server-side only
//! - The envelope timestamp is rendered at classification time, not
//!   pulled from logger internals
//! - The rendered response carries a `FailureInfo` extension so the
//!   instrumentation middleware can record the failure exactly once

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::taxonomy::{Details, MonitoringError};
use crate::http::server::AppState;
use crate::observability::logging::{Level, StructuredLogger};

/// Fixed client-facing message for unclassified failures.
const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Canonical wire envelope for every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
    pub timestamp: String,
}

/// Classification of a request failure, attached to responses so the
/// instrumentation middleware can label its error metrics.
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub error_type: String,
    pub message: String,
}

/// A failure surfaced by a handler, prior to classification.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// One of the declared taxonomy kinds.
    Monitoring(MonitoringError),
    /// Framework-level client error carrying its own status code.
    Http { status: StatusCode, message: String },
    /// Downstream dispatch exceeded its deadline or was cancelled.
    Timeout,
    /// Unclassified internal failure; raw text stays server-side.
    Internal { error_type: String, message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Internal {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Failure kind used as the `error_type` metric label.
    pub fn failure_kind(&self) -> String {
        match self {
            Self::Monitoring(e) => e.kind_name().to_string(),
            Self::Http { status, .. } => format!("HTTP_{}", status.as_u16()),
            Self::Timeout => "timeout".to_string(),
            Self::Internal { error_type, .. } => error_type.clone(),
        }
    }
}

impl From<MonitoringError> for ApiError {
    fn from(err: MonitoringError) -> Self {
        Self::Monitoring(err)
    }
}

/// Handlers never render failures themselves: `Err(ApiError)` becomes a
/// placeholder response carrying the error, and the classification layer
/// turns it into the canonical envelope with full request context.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response.extensions_mut().insert(self);
        response
    }
}

/// Classification middleware: sits directly around the route handlers and
/// finishes any response whose extensions carry an [`ApiError`].
pub async fn handle_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<ApiError>() {
        Some(error) => render_error(&error, &method, &path, &state.loggers.get("exceptions")),
        None => response,
    }
}

/// Log and render one classified failure. Shared by the classification
/// middleware and the dispatch-deadline path in the instrumentation layer.
pub fn render_error(
    error: &ApiError,
    method: &str,
    path: &str,
    logger: &StructuredLogger,
) -> Response {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    let (status, body) = match error {
        ApiError::Monitoring(e) => {
            let mut fields = crate::fields! {
                "error_code" => e.error_code(),
                "error_message" => e.message(),
                "request_path" => path,
                "request_method" => method,
            };
            fields.insert("details".to_string(), json!(e.details().clone()));
            logger.log(
                Level::Warning,
                &format!("Monitoring exception: {}", e.error_code()),
                fields,
            );

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: e.error_code().to_string(),
                    message: e.message().to_string(),
                    details: Some(e.details().clone()),
                    timestamp,
                },
            )
        }
        ApiError::Http { status, message } => {
            logger.log(
                Level::Warning,
                &format!("HTTP exception: {}", status.as_u16()),
                crate::fields! {
                    "status_code" => status.as_u16(),
                    "detail" => message,
                    "request_path" => path,
                    "request_method" => method,
                },
            );

            (
                *status,
                ErrorBody {
                    code: format!("HTTP_{}", status.as_u16()),
                    message: message.clone(),
                    details: None,
                    timestamp,
                },
            )
        }
        ApiError::Timeout => {
            logger.log(
                Level::Warning,
                "HTTP exception: 504",
                crate::fields! {
                    "status_code" => 504,
                    "detail" => "Request dispatch exceeded its deadline",
                    "request_path" => path,
                    "request_method" => method,
                },
            );

            (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody {
                    code: "HTTP_504".to_string(),
                    message: "Request dispatch exceeded its deadline".to_string(),
                    details: None,
                    timestamp,
                },
            )
        }
        ApiError::Internal { error_type, message } => {
            logger.log_exception(
                Level::Critical,
                &format!("Unhandled exception: {}", error_type),
                crate::fields! {
                    "exception_type" => error_type,
                    "exception_message" => message,
                    "request_path" => path,
                    "request_method" => method,
                },
                message,
            );

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "INTERNAL_SERVER_ERROR".to_string(),
                    message: GENERIC_ERROR_MESSAGE.to_string(),
                    details: None,
                    timestamp,
                },
            )
        }
    };

    let info = FailureInfo {
        error_type: error.failure_kind(),
        message: body.message.clone(),
    };

    let mut response = (status, Json(ErrorEnvelope { error: body })).into_response();
    response.extensions_mut().insert(info);
    response
}
