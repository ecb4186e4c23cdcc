//! Structured logging.
//!
//! # Responsibilities
//! - Route leveled events to console, application log, and error log
//! - Render human-readable lines on the console, JSON lines in files
//! - Keep file writes off the request path (dedicated writer threads)
//!
//! # Design Decisions
//! - Each destination carries its own minimum severity
//! - A failing destination is skipped, never surfaced to the caller
//! - Loggers are keyed by name and share one destination set

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::config::LoggingConfig;

/// Open mapping of extra field name to value attached to a log event.
pub type Fields = Map<String, Value>;

/// Build a [`Fields`] map inline.
///
/// ```
/// use monitoring_api::fields;
/// let f = fields! { "request_method" => "GET", "status_code" => 200 };
/// assert_eq!(f["status_code"], 200);
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:literal => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::observability::logging::Fields::new();
        $(map.insert($key.to_string(), serde_json::json!($value));)*
        map
    }};
}

/// Log severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Parse a configured level name; unknown names fall back to `Info`.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Level::Debug,
            "warning" | "warn" => Level::Warning,
            "error" => Level::Error,
            "critical" => Level::Critical,
            _ => Level::Info,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structured log event. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub logger: String,
    pub message: String,
    /// Best-effort origin (module path of the emitting code).
    pub module: Option<String>,
    pub fields: Fields,
    pub exception: Option<String>,
}

impl LogEvent {
    /// Render as a JSON line for file destinations.
    fn to_json_line(&self) -> String {
        let mut record = Map::new();
        record.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        record.insert("level".to_string(), Value::String(self.level.as_str().to_string()));
        record.insert("logger".to_string(), Value::String(self.logger.clone()));
        record.insert("message".to_string(), Value::String(self.message.clone()));
        if let Some(module) = &self.module {
            record.insert("module".to_string(), Value::String(module.clone()));
        }
        if let Some(exception) = &self.exception {
            record.insert("exception".to_string(), Value::String(exception.clone()));
        }
        for (key, value) in &self.fields {
            record.insert(key.clone(), value.clone());
        }
        Value::Object(record).to_string()
    }

    /// Render as a human-readable line for the console destination.
    fn to_console_line(&self) -> String {
        let mut line = format!(
            "{} - {} - {} - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.logger,
            self.level,
            self.message
        );
        if !self.fields.is_empty() {
            line.push(' ');
            line.push_str(&Value::Object(self.fields.clone()).to_string());
        }
        line
    }
}

/// One output a log event can be routed to.
pub trait LogDestination: Send + Sync {
    /// Unique destination name; used to prevent duplicate registration.
    fn name(&self) -> &str;

    /// Minimum severity this destination accepts.
    fn min_level(&self) -> Level;

    /// Write one event. Must swallow its own failures.
    fn write(&self, event: &LogEvent);
}

/// Interactive console destination (human-readable lines on stdout).
pub struct ConsoleDestination {
    min_level: Level,
}

impl ConsoleDestination {
    pub fn new(min_level: Level) -> Self {
        Self { min_level }
    }
}

impl LogDestination for ConsoleDestination {
    fn name(&self) -> &str {
        "console"
    }

    fn min_level(&self) -> Level {
        self.min_level
    }

    fn write(&self, event: &LogEvent) {
        let _ = writeln!(std::io::stdout(), "{}", event.to_console_line());
    }
}

/// File destination writing JSON lines through a dedicated writer thread.
///
/// The request path only pushes onto a channel; disk latency and disk
/// errors stay on the writer thread. A failing writer drops events for
/// this destination while the others keep working, with a one-time notice
/// routed to the console destination when one is attached.
pub struct FileDestination {
    name: String,
    min_level: Level,
    tx: mpsc::Sender<String>,
}

impl FileDestination {
    pub fn new(
        path: &Path,
        min_level: Level,
        console: Option<Arc<dyn LogDestination>>,
    ) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let name = format!("file:{}", path.display());
        let (tx, rx) = mpsc::channel::<String>();
        let reported = AtomicBool::new(false);
        let destination = name.clone();

        std::thread::Builder::new()
            .name(format!("log-writer {}", path.display()))
            .spawn(move || {
                for line in rx {
                    if writeln!(file, "{}", line).is_err()
                        && !reported.swap(true, Ordering::Relaxed)
                    {
                        report_unavailable(console.as_deref(), &destination);
                    }
                }
            })?;

        Ok(Self { name, min_level, tx })
    }
}

/// One-time notice that a file destination stopped accepting writes.
fn report_unavailable(console: Option<&dyn LogDestination>, destination: &str) {
    let console = match console {
        Some(c) => c,
        None => return,
    };
    let event = LogEvent {
        timestamp: Utc::now(),
        level: Level::Error,
        logger: "logging".to_string(),
        message: format!("Log destination unavailable, dropping events: {}", destination),
        module: None,
        fields: Fields::new(),
        exception: None,
    };
    if Level::Error >= console.min_level() {
        console.write(&event);
    }
}

impl LogDestination for FileDestination {
    fn name(&self) -> &str {
        &self.name
    }

    fn min_level(&self) -> Level {
        self.min_level
    }

    fn write(&self, event: &LogEvent) {
        let _ = self.tx.send(event.to_json_line());
    }
}

/// Process-wide logger hub: one shared destination set, loggers by name.
pub struct LoggerHub {
    destinations: Arc<Vec<Arc<dyn LogDestination>>>,
    loggers: DashMap<String, StructuredLogger>,
}

impl LoggerHub {
    /// Build a hub from an explicit destination list, dropping duplicates
    /// by destination name.
    pub fn new(destinations: Vec<Arc<dyn LogDestination>>) -> Self {
        let mut unique: Vec<Arc<dyn LogDestination>> = Vec::new();
        for dest in destinations {
            if !unique.iter().any(|d| d.name() == dest.name()) {
                unique.push(dest);
            }
        }
        Self {
            destinations: Arc::new(unique),
            loggers: DashMap::new(),
        }
    }

    /// Standard destination set: console, application log, error log.
    ///
    /// A file that cannot be opened is skipped; logging proceeds with the
    /// destinations that are healthy.
    pub fn from_settings(config: &LoggingConfig) -> Self {
        let dir = Path::new(&config.dir);
        let _ = fs::create_dir_all(dir);

        let console: Arc<dyn LogDestination> = Arc::new(ConsoleDestination::new(Level::parse(
            &config.console_level,
        )));
        let mut destinations: Vec<Arc<dyn LogDestination>> = vec![console.clone()];

        match FileDestination::new(
            &dir.join("application.log"),
            Level::parse(&config.file_level),
            Some(console.clone()),
        ) {
            Ok(dest) => destinations.push(Arc::new(dest)),
            Err(e) => tracing::warn!(error = %e, "application log unavailable"),
        }
        match FileDestination::new(
            &dir.join("errors.log"),
            Level::parse(&config.error_file_level),
            Some(console.clone()),
        ) {
            Ok(dest) => destinations.push(Arc::new(dest)),
            Err(e) => tracing::warn!(error = %e, "error log unavailable"),
        }

        Self::new(destinations)
    }

    /// Get (or create) the logger for `name`. Repeated calls return
    /// functionally equivalent loggers sharing the same destinations.
    pub fn get(&self, name: &str) -> StructuredLogger {
        self.loggers
            .entry(name.to_string())
            .or_insert_with(|| StructuredLogger {
                name: name.to_string(),
                destinations: self.destinations.clone(),
            })
            .clone()
    }
}

/// Named logger writing to the hub's destination set.
#[derive(Clone)]
pub struct StructuredLogger {
    name: String,
    destinations: Arc<Vec<Arc<dyn LogDestination>>>,
}

impl StructuredLogger {
    /// Route one event to every destination whose threshold admits it.
    pub fn log(&self, level: Level, message: &str, fields: Fields) {
        self.dispatch(level, message, fields, None);
    }

    /// Like [`log`](Self::log) with an attached failure trace.
    pub fn log_exception(&self, level: Level, message: &str, fields: Fields, exception: &str) {
        self.dispatch(level, message, fields, Some(exception.to_string()));
    }

    fn dispatch(&self, level: Level, message: &str, fields: Fields, exception: Option<String>) {
        let event = LogEvent {
            timestamp: Utc::now(),
            level,
            logger: self.name.clone(),
            message: message.to_string(),
            module: Some(env!("CARGO_PKG_NAME").to_string()),
            fields,
            exception,
        };
        for dest in self.destinations.iter() {
            if level >= dest.min_level() {
                dest.write(&event);
            }
        }
    }

    pub fn debug(&self, message: &str, fields: Fields) {
        self.log(Level::Debug, message, fields);
    }

    pub fn info(&self, message: &str, fields: Fields) {
        self.log(Level::Info, message, fields);
    }

    pub fn warning(&self, message: &str, fields: Fields) {
        self.log(Level::Warning, message, fields);
    }

    pub fn error(&self, message: &str, fields: Fields) {
        self.log(Level::Error, message, fields);
    }

    pub fn critical(&self, message: &str, fields: Fields) {
        self.log(Level::Critical, message, fields);
    }

    /// Record a metric observation with the conventional field set.
    pub fn log_metric(&self, metric_name: &str, value: f64, mut fields: Fields) {
        fields.insert("metric_name".to_string(), Value::String(metric_name.to_string()));
        fields.insert("metric_value".to_string(), serde_json::json!(value));
        self.info(&format!("Metric recorded: {}", metric_name), fields);
    }

    /// Record a completed API request with the conventional field set.
    pub fn log_api_request(
        &self,
        method: &str,
        path: &str,
        status_code: u16,
        response_time_secs: f64,
        mut fields: Fields,
    ) {
        fields.insert("request_method".to_string(), Value::String(method.to_string()));
        fields.insert("request_path".to_string(), Value::String(path.to_string()));
        fields.insert("status_code".to_string(), serde_json::json!(status_code));
        fields.insert(
            "response_time_ms".to_string(),
            serde_json::json!(response_time_secs * 1000.0),
        );
        self.info(
            &format!("API Request: {} {} - {}", method, path, status_code),
            fields,
        );
    }

    /// Record a triggered alert with the conventional field set.
    pub fn log_alert(&self, alert_name: &str, severity: &str, message: &str, mut fields: Fields) {
        fields.insert("alert_name".to_string(), Value::String(alert_name.to_string()));
        fields.insert("alert_severity".to_string(), Value::String(severity.to_string()));
        fields.insert("alert_message".to_string(), Value::String(message.to_string()));
        self.warning(&format!("Alert triggered: {}", alert_name), fields);
    }
}
