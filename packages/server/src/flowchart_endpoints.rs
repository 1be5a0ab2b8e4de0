//! Flowchart endpoints
//!
//! - `GET /api/health` - Health check
//! - `POST /api/v1/flowchart` - Store or replace a flowchart by key
//! - `GET /api/v1/flowchart/:key` - Fetch a flowchart

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use flowchart_core::models::UnstructuredData;
use flowchart_core::transport::FlowChartDto;
use serde::Serialize;

use crate::http_error::{Envelope, HttpError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Store or replace a flowchart
///
/// The body is decoded by hand so that malformed JSON maps to 400 with the
/// envelope instead of axum's plain-text rejection.
///
/// ```bash
/// curl -X POST http://localhost:3001/api/v1/flowchart \
///   -H 'Content-Type: application/json' \
///   -d '{"title":"Flow","key":"flow","nodes":[{"id":"0","data":{"label":"Start"}}],"edges":[]}'
/// ```
async fn edit_flowchart(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Envelope>, HttpError> {
    let dto: FlowChartDto<UnstructuredData> =
        serde_json::from_slice(&body).map_err(HttpError::malformed_body)?;

    let outcome = state
        .service
        .edit(dto, |data| data)
        .await
        .map_err(HttpError::from_write)?;
    tracing::debug!(id = outcome.id(), "Edit accepted");
    Ok(Json(Envelope::ok()))
}

async fn get_flowchart(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FlowChartDto<UnstructuredData>>, HttpError> {
    let chart = state.service.fetch(&key).await?;
    Ok(Json(FlowChartDto::from(&chart)))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/v1/flowchart", post(edit_flowchart))
        .route("/api/v1/flowchart/:key", get(get_flowchart))
        .with_state(state)
}
