//! Caller-supplied deadlines for store operations

use crate::db::error::DatabaseError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Point in time by which a store operation must finish
///
/// Checked before a transaction opens and before each statement inside it;
/// the transactional body also runs under [`tokio::time::timeout_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn at(instant: Instant) -> Self {
        Self { at: instant }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Fail with [`DatabaseError::DeadlineExceeded`] once the deadline has passed
    pub fn check(&self, operation: &str) -> Result<(), DatabaseError> {
        if self.is_expired() {
            return Err(DatabaseError::deadline_exceeded(operation));
        }
        Ok(())
    }

    /// Drive `future` until it finishes or the deadline passes
    pub async fn run<T, F>(&self, operation: &str, future: F) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, DatabaseError>>,
    {
        timeout_at(self.at, future)
            .await
            .map_err(|_| DatabaseError::deadline_exceeded(operation))?
    }
}
