//! Monitoring Platform API
//!
//! An observability-focused HTTP service built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌───────────────────────────────────────────────┐
//!                    │              MONITORING API                    │
//!                    │                                                │
//!   Client Request   │  ┌─────────┐   ┌───────────────┐   ┌───────┐  │
//!   ─────────────────┼─▶│  http   │──▶│instrumentation│──▶│ api   │  │
//!                    │  │ server  │   │  middleware   │   │routes │  │
//!                    │  └─────────┘   └──────┬────────┘   └───┬───┘  │
//!                    │                       │                │      │
//!                    │                       ▼                ▼      │
//!                    │              ┌──────────────┐  ┌────────────┐ │
//!                    │              │observability │  │   errors   │ │
//!                    │              │metrics + logs│  │ taxonomy + │ │
//!                    │              │              │  │  envelope  │ │
//!   Client Response  │              └──────────────┘  └────────────┘ │
//!   ◀────────────────┼───────────────────────────────────────────── │
//!                    └───────────────────────────────────────────────┘
//! ```
//!
//! Every request is timed, metered, and logged exactly once; failures are
//! classified into a stable error taxonomy before they reach the client.

use std::path::Path;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monitoring_api::config::loader::load_settings;
use monitoring_api::config::Settings;
use monitoring_api::http::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monitoring_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("monitoring-api v{} starting", env!("CARGO_PKG_VERSION"));

    // Load settings (defaults when no file is given)
    let settings = match std::env::args().nth(1) {
        Some(path) => load_settings(Path::new(&path))?,
        None => Settings::default(),
    };

    tracing::info!(
        bind_address = %settings.listener.bind_address,
        request_timeout_secs = settings.listener.request_timeout_secs,
        api_prefix = %settings.service.api_v1_prefix,
        "Settings loaded"
    );

    // Bind TCP listener
    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    // Create and run HTTP server
    let server = HttpServer::new(settings)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
