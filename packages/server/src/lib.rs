//! Flowchart HTTP server
//!
//! REST surface over [`flowchart_core::services::FlowChartService`], storing
//! unstructured JSON payloads in a local libsql database.
//!
//! # Endpoints
//!
//! - `GET /api/health`
//! - `POST /api/v1/flowchart`
//! - `GET /api/v1/flowchart/:key`

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use flowchart_core::db::{DatabaseService, TursoFlowChartStore};
use flowchart_core::models::UnstructuredData;
use flowchart_core::services::FlowChartService;

pub mod config;
mod flowchart_endpoints;
mod http_error;

pub use config::{AppConfig, ConfigError};
pub use http_error::{Envelope, HttpError};

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: FlowChartService<UnstructuredData>,
}

impl AppState {
    /// Wire the libsql store into a service with the configured timeout
    pub fn new(db: Arc<DatabaseService>, config: &AppConfig) -> Self {
        let store = Arc::new(TursoFlowChartStore::new(db));
        Self {
            service: FlowChartService::new(store).with_operation_timeout(config.request_timeout),
        }
    }
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(flowchart_endpoints::routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS layer for browser editors
///
/// Allows the single `origin` when given, otherwise the usual localhost dev
/// server ports.
pub fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let default_origins = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:1420",
    ];

    let origins = match origin {
        Some(custom) => vec![custom.parse::<HeaderValue>().with_context(|| {
            format!("Invalid CORS_ALLOW_ORIGIN '{}' - must be a valid HTTP origin", custom)
        })?],
        None => default_origins
            .into_iter()
            .map(HeaderValue::from_static)
            .collect(),
    };

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers(Any)
        .allow_credentials(false))
}

/// Open the database and serve until the process is stopped
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let db = Arc::new(
        DatabaseService::new(config.database_path.clone())
            .await
            .with_context(|| format!("Failed to open {}", config.database_path.display()))?,
    );
    let app = create_router(
        AppState::new(db, &config),
        cors_layer(config.cors_allow_origin.as_deref())?,
    );

    let addr = config.socket_addr();
    tracing::info!("🚀 Flowchart server starting on http://{}", addr);
    tracing::info!("💾 Database: {}", config.database_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
