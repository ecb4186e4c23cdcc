//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Maintain the process-wide set of named counters, histograms, gauges
//! - Track per-label-combination series, created lazily on first use
//! - Render the Prometheus text exposition format for scraping
//!
//! # Design Decisions
//! - Low-overhead updates: atomic f64 cells, one per series
//! - Series live in a `DashMap` keyed by label values, so concurrent
//!   updates on unrelated combinations never contend on one lock
//! - Histogram buckets tuned for typical web latencies
//! - Export is deterministic: metrics in registration order, series
//!   sorted by label values

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::errors::taxonomy::{MonitoringError, MonitoringResult};

/// Histogram bucket upper bounds in seconds.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Histogram,
    Gauge,
}

impl MetricKind {
    fn exposition_type(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Gauge => "gauge",
        }
    }
}

/// An `f64` stored in an atomic cell.
///
/// Additions use a compare-and-swap loop, so concurrent increments on the
/// same series all land (no lost updates).
#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

/// Cumulative histogram cells (unlabeled).
#[derive(Debug)]
struct HistogramCells {
    /// Per-bucket observation counts; the final slot is the overflow
    /// (+Inf) bucket.
    buckets: Vec<AtomicU64>,
    sum: AtomicF64,
    count: AtomicU64,
}

impl HistogramCells {
    fn new() -> Self {
        Self {
            buckets: (0..=DURATION_BUCKETS.len()).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicF64::new(0.0),
            count: AtomicU64::new(0),
        }
    }
}

/// One registered metric: identity plus its live series.
#[derive(Debug)]
struct MetricInner {
    name: String,
    help: String,
    kind: MetricKind,
    label_names: Vec<String>,
    /// Counter and gauge series, keyed by label values.
    series: DashMap<Vec<String>, AtomicF64>,
    /// Present only for histograms.
    histogram: Option<HistogramCells>,
}

impl MetricInner {
    /// Fetch or lazily create the series for a label combination.
    fn series_cell(
        &self,
        label_values: &[&str],
    ) -> MonitoringResult<dashmap::mapref::one::RefMut<'_, Vec<String>, AtomicF64>> {
        if label_values.len() != self.label_names.len() {
            return Err(MonitoringError::validation(format!(
                "Metric {} expects {} label values, got {}",
                self.name,
                self.label_names.len(),
                label_values.len()
            ))
            .with_detail("metric_name", self.name.clone().into()));
        }
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        Ok(self.series.entry(key).or_insert_with(|| AtomicF64::new(0.0)))
    }
}

/// Handle to a registered counter.
#[derive(Debug, Clone)]
pub struct Counter(Arc<MetricInner>);

impl Counter {
    /// Add `delta` to the series for `label_values`.
    ///
    /// `delta` must be non-negative; counters never decrease. Unseen label
    /// combinations are created at zero before the delta is applied.
    pub fn increment(&self, label_values: &[&str], delta: f64) -> MonitoringResult<()> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(MonitoringError::validation(format!(
                "Counter {} delta must be non-negative, got {}",
                self.0.name, delta
            ))
            .with_detail("metric_name", self.0.name.clone().into()));
        }
        self.0.series_cell(label_values)?.add(delta);
        Ok(())
    }

    /// Increment by one.
    pub fn inc(&self, label_values: &[&str]) -> MonitoringResult<()> {
        self.increment(label_values, 1.0)
    }

    /// Current value for a label combination (zero if never touched).
    pub fn value(&self, label_values: &[&str]) -> f64 {
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        self.0.series.get(&key).map(|c| c.load()).unwrap_or(0.0)
    }
}

/// Handle to a registered gauge.
#[derive(Debug, Clone)]
pub struct Gauge(Arc<MetricInner>);

impl Gauge {
    /// Set the series for `label_values`; last write wins.
    pub fn set(&self, label_values: &[&str], value: f64) -> MonitoringResult<()> {
        self.0.series_cell(label_values)?.store(value);
        Ok(())
    }

    /// Adjust the series by `delta` (may be negative).
    pub fn add(&self, label_values: &[&str], delta: f64) -> MonitoringResult<()> {
        self.0.series_cell(label_values)?.add(delta);
        Ok(())
    }

    /// Current value for a label combination (zero if never set).
    pub fn value(&self, label_values: &[&str]) -> f64 {
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        self.0.series.get(&key).map(|c| c.load()).unwrap_or(0.0)
    }
}

/// Handle to a registered histogram.
#[derive(Clone)]
pub struct Histogram(Arc<MetricInner>);

impl Histogram {
    /// Record an observed duration in seconds.
    ///
    /// Negative, NaN, and infinite values land in the overflow bucket
    /// instead of failing: observability must never crash the request path.
    pub fn observe(&self, value: f64) {
        let cells = match &self.0.histogram {
            Some(c) => c,
            None => return,
        };
        let in_range = value.is_finite() && value >= 0.0;
        let slot = if in_range {
            DURATION_BUCKETS
                .iter()
                .position(|bound| value <= *bound)
                .unwrap_or(DURATION_BUCKETS.len())
        } else {
            DURATION_BUCKETS.len()
        };
        cells.buckets[slot].fetch_add(1, Ordering::Relaxed);
        cells.count.fetch_add(1, Ordering::Relaxed);
        if in_range {
            cells.sum.add(value);
        }
    }

    /// Total number of observations.
    pub fn count(&self) -> u64 {
        self.0
            .histogram
            .as_ref()
            .map(|c| c.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

/// Process-wide collection of named metrics.
///
/// Constructed once at startup and shared via `Arc`; tests build a fresh
/// isolated registry per test.
pub struct MetricsRegistry {
    metrics: RwLock<Vec<Arc<MetricInner>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(Vec::new()),
        }
    }

    /// Register a counter, or return the existing one if the signature matches.
    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MonitoringResult<Counter> {
        self.register(name, MetricKind::Counter, help, label_names)
            .map(Counter)
    }

    /// Register an unlabeled histogram with web-latency buckets.
    pub fn register_histogram(&self, name: &str, help: &str) -> MonitoringResult<Histogram> {
        self.register(name, MetricKind::Histogram, help, &[])
            .map(Histogram)
    }

    /// Register a gauge, or return the existing one if the signature matches.
    pub fn register_gauge(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> MonitoringResult<Gauge> {
        self.register(name, MetricKind::Gauge, help, label_names)
            .map(Gauge)
    }

    fn register(
        &self,
        name: &str,
        kind: MetricKind,
        help: &str,
        label_names: &[&str],
    ) -> MonitoringResult<Arc<MetricInner>> {
        let mut metrics = self.metrics.write().expect("metrics registry poisoned");

        if let Some(existing) = metrics.iter().find(|m| m.name == name) {
            if existing.kind != kind || existing.label_names != label_names {
                return Err(MonitoringError::configuration(
                    format!("Metric {} already registered with a different signature", name),
                    name,
                )
                .with_detail("registered_kind", existing.kind.exposition_type().into())
                .with_detail("requested_kind", kind.exposition_type().into()));
            }
            return Ok(existing.clone());
        }

        let inner = Arc::new(MetricInner {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            series: DashMap::new(),
            histogram: match kind {
                MetricKind::Histogram => Some(HistogramCells::new()),
                _ => None,
            },
        });

        // Unlabeled counters and gauges expose a zero sample immediately.
        if label_names.is_empty() && kind != MetricKind::Histogram {
            inner.series.insert(Vec::new(), AtomicF64::new(0.0));
        }

        metrics.push(inner.clone());
        Ok(inner)
    }

    /// Render every registered metric in the Prometheus text exposition
    /// format, in registration order.
    ///
    /// Safe to call concurrently with updates; each metric renders a
    /// consistent snapshot of its own series.
    pub fn export(&self) -> String {
        let metrics = self.metrics.read().expect("metrics registry poisoned");
        let mut out = String::new();

        for metric in metrics.iter() {
            out.push_str(&format!("# HELP {} {}\n", metric.name, metric.help));
            out.push_str(&format!(
                "# TYPE {} {}\n",
                metric.name,
                metric.kind.exposition_type()
            ));

            match metric.kind {
                MetricKind::Counter | MetricKind::Gauge => {
                    let mut samples: Vec<(Vec<String>, f64)> = metric
                        .series
                        .iter()
                        .map(|entry| (entry.key().clone(), entry.value().load()))
                        .collect();
                    samples.sort_by(|a, b| a.0.cmp(&b.0));

                    for (values, sample) in samples {
                        out.push_str(&metric.name);
                        out.push_str(&render_labels(&metric.label_names, &values));
                        out.push(' ');
                        out.push_str(&render_value(sample));
                        out.push('\n');
                    }
                }
                MetricKind::Histogram => {
                    let cells = metric.histogram.as_ref().expect("histogram without cells");
                    let mut cumulative = 0u64;
                    for (i, bound) in DURATION_BUCKETS.iter().enumerate() {
                        cumulative += cells.buckets[i].load(Ordering::Relaxed);
                        out.push_str(&format!(
                            "{}_bucket{{le=\"{}\"}} {}\n",
                            metric.name, bound, cumulative
                        ));
                    }
                    cumulative += cells.buckets[DURATION_BUCKETS.len()].load(Ordering::Relaxed);
                    out.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", metric.name, cumulative));
                    out.push_str(&format!(
                        "{}_sum {}\n",
                        metric.name,
                        render_value(cells.sum.load())
                    ));
                    out.push_str(&format!(
                        "{}_count {}\n",
                        metric.name,
                        cells.count.load(Ordering::Relaxed)
                    ));
                }
            }
        }

        out
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn render_labels(names: &[String], values: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = names
        .iter()
        .zip(values.iter())
        .map(|(n, v)| format!("{}=\"{}\"", n, escape_label_value(v)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Integral samples render without a decimal point, matching the usual
/// exposition output for counters.
fn render_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// The platform's conventional metric set, pre-registered on one registry.
pub struct AppMetrics {
    pub registry: Arc<MetricsRegistry>,

    /// `http_requests_total{method,endpoint,status}`
    pub request_count: Counter,
    /// `http_request_duration_seconds`
    pub request_duration: Histogram,
    /// `http_request_errors_total{method,endpoint,error_type}`
    pub error_count: Counter,
    /// `active_connections`
    pub active_connections: Gauge,
    /// `database_connections_active`
    pub database_connections: Gauge,
    /// `user_registrations_total`
    pub user_registrations: Counter,
    /// `api_calls_total{service,endpoint}`
    pub api_calls: Counter,
    /// `error_rate_percentage`
    pub error_rate: Gauge,
    /// `inventory_levels{product_id,category}`
    pub inventory_levels: Gauge,
    /// `sales_volume_total{product_category}`
    pub sales_volume: Counter,
    /// `response_time_p95_seconds`
    pub response_time_p95: Gauge,
    /// `requests_per_second`
    pub requests_per_second: Gauge,
}

impl AppMetrics {
    pub fn new() -> MonitoringResult<Self> {
        let registry = Arc::new(MetricsRegistry::new());

        let request_count = registry.register_counter(
            "http_requests_total",
            "Total HTTP requests",
            &["method", "endpoint", "status"],
        )?;
        let request_duration = registry
            .register_histogram("http_request_duration_seconds", "HTTP request duration")?;
        let error_count = registry.register_counter(
            "http_request_errors_total",
            "Total failed HTTP requests",
            &["method", "endpoint", "error_type"],
        )?;
        let active_connections =
            registry.register_gauge("active_connections", "Number of active connections", &[])?;
        let database_connections = registry.register_gauge(
            "database_connections_active",
            "Active database connections",
            &[],
        )?;
        let user_registrations = registry.register_counter(
            "user_registrations_total",
            "Total user registrations",
            &[],
        )?;
        let api_calls = registry.register_counter(
            "api_calls_total",
            "Total API calls",
            &["service", "endpoint"],
        )?;
        let error_rate =
            registry.register_gauge("error_rate_percentage", "Error rate percentage", &[])?;
        let inventory_levels = registry.register_gauge(
            "inventory_levels",
            "Current inventory levels",
            &["product_id", "category"],
        )?;
        let sales_volume = registry.register_counter(
            "sales_volume_total",
            "Total sales volume",
            &["product_category"],
        )?;
        let response_time_p95 = registry.register_gauge(
            "response_time_p95_seconds",
            "95th percentile response time",
            &[],
        )?;
        let requests_per_second =
            registry.register_gauge("requests_per_second", "Current requests per second", &[])?;

        Ok(Self {
            registry,
            request_count,
            request_duration,
            error_count,
            active_connections,
            database_connections,
            user_registrations,
            api_calls,
            error_rate,
            inventory_levels,
            sales_volume,
            response_time_p95,
            requests_per_second,
        })
    }
}
