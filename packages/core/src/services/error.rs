//! Service Layer Error Types
//!
//! This module defines error types for flowchart service operations.

use crate::db::DatabaseError;
use crate::models::BuildError;
use thiserror::Error;

/// Flowchart service errors
#[derive(Error, Debug)]
pub enum FlowChartServiceError {
    /// The submitted nodes/edges do not form a valid flowchart tree
    #[error("Invalid flowchart: {0}")]
    InvalidInput(#[from] BuildError),

    /// No flowchart is stored under the key
    #[error("Flowchart not found: {key}")]
    NotFound { key: String },

    /// Stored rows no longer form a valid tree
    #[error("Stored flowchart '{key}' is corrupted: {source}")]
    Corrupted { key: String, source: BuildError },

    /// Database operation failed (already rolled back)
    #[error("Database operation failed: {0}")]
    DatabaseError(DatabaseError),
}

impl FlowChartServiceError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn corrupted(key: impl Into<String>, source: BuildError) -> Self {
        Self::Corrupted {
            key: key.into(),
            source,
        }
    }
}

impl From<DatabaseError> for FlowChartServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::FlowChartNotFound { key } => Self::NotFound { key },
            other => Self::DatabaseError(other),
        }
    }
}
