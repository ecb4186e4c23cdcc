//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use monitoring_api::config::Settings;
use monitoring_api::http::HttpServer;
use monitoring_api::observability::logging::LoggerHub;
use monitoring_api::observability::metrics::AppMetrics;

/// Start the monitoring API on an ephemeral port with isolated
/// observability singletons. Returns the bound address and the metrics
/// handle for assertions.
pub async fn start_server(settings: Settings) -> (SocketAddr, Arc<AppMetrics>) {
    let metrics = Arc::new(AppMetrics::new().unwrap());
    // No destinations: integration tests assert through metrics and
    // response bodies, not log output.
    let loggers = Arc::new(LoggerHub::new(Vec::new()));

    let server = HttpServer::with_observability(settings, metrics.clone(), loggers).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, metrics)
}

/// Build a client that ignores proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
