//! Flowchart server binary
//!
//! # Environment Variables
//!
//! - `FLOWCHART_DB_PATH`: database file (default: ~/.flowchart/database/flowchart.db)
//! - `FLOWCHART_HOST` / `FLOWCHART_PORT`: bind address (default: 127.0.0.1:3001)
//! - `FLOWCHART_REQUEST_TIMEOUT_MS`: per-operation time budget (default: 5000)
//! - `CORS_ALLOW_ORIGIN`: allowed browser origin
//! - `RUST_LOG`: logging level (e.g., "info", "debug", "trace")

use flowchart_server::{start_server, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        "📡 Port: {} | ⏱️  Request timeout: {:?}",
        config.port,
        config.request_timeout
    );

    start_server(config).await
}
