//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → Settings (immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs

pub mod loader;
pub mod schema;

pub use schema::{CorsConfig, ListenerConfig, LoggingConfig, ServiceConfig, Settings};
