//! HTTP error handling
//!
//! Every failure is rendered as the write envelope `{"success": false, "error": "..."}`
//! with a status derived from the error kind. Writes always fail with 422.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use flowchart_core::services::FlowChartServiceError;
use serde::{Deserialize, Serialize};

/// Response envelope for writes and for every error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub error: String,
}

impl Envelope {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: String::new(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Request body is not valid JSON for a flowchart
    pub fn malformed_body(err: serde_json::Error) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("Malformed request body: {}", err))
    }

    /// Failed write: every service error, a missing key included, is a 422
    pub fn from_write(err: FlowChartServiceError) -> Self {
        tracing::warn!(error = %err, "Flowchart write failed");
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::failure(self.message))).into_response()
    }
}

impl From<FlowChartServiceError> for HttpError {
    fn from(err: FlowChartServiceError) -> Self {
        let status = match &err {
            FlowChartServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            FlowChartServiceError::InvalidInput(_)
            | FlowChartServiceError::Corrupted { .. }
            | FlowChartServiceError::DatabaseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::warn!(error = %err, "Flowchart request failed");
        }
        Self::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowchart_core::db::DatabaseError;
    use flowchart_core::models::BuildError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (FlowChartServiceError::not_found("k"), StatusCode::NOT_FOUND),
            (
                FlowChartServiceError::InvalidInput(BuildError::NoRoot),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                FlowChartServiceError::DatabaseError(DatabaseError::deadline_exceeded("fetch")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(HttpError::from(err).status, expected);
        }
    }

    #[test]
    fn test_write_failures_are_unprocessable() {
        let err = HttpError::from_write(FlowChartServiceError::not_found("gone"));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.message.contains("gone"));

        let err = HttpError::from_write(FlowChartServiceError::InvalidInput(BuildError::NoRoot));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(Envelope::ok()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "error": "" }));
    }
}
