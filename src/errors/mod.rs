//! Error taxonomy subsystem.
//!
//! # Data Flow
//! ```text
//! Component detects failure
//!     → taxonomy.rs (closed set of error kinds, stable codes)
//!     → handler.rs (classify, log, render canonical envelope)
//!     → client receives {"error": {code, message, details, timestamp}}
//! ```
//!
//! # Design Decisions
//! - Failures are values (Result), not unwinding; propagation is explicit
//! - Infrastructure failures wrap root cause in `details`
//! - No automatic retries; callers own retry policy

pub mod handler;
pub mod taxonomy;

pub use handler::{ApiError, ErrorEnvelope, FailureInfo};
pub use taxonomy::{
    safe_divide, validate_metric_value, validate_required_fields, Details, MonitoringError,
    MonitoringResult,
};
