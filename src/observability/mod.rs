//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request middleware and handlers produce:
//!     → logging.rs (leveled structured events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Console / application.log / errors.log destinations
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Registry and logger hub are built once at startup and shared via Arc
//! - Metric updates are atomic; series never contend across combinations
//! - Log destinations filter independently by minimum severity

pub mod logging;
pub mod metrics;
