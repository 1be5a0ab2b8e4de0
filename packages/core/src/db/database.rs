//! Database Connection Management
//!
//! This module provides the database connection and schema initialization
//! for flowchart storage using libsql (embedded SQLite).
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **Idempotent schema**: `CREATE TABLE IF NOT EXISTS`, safe on every start
//! - **WAL mode**: readers see either the old or the new tree while a replace runs
//! - **Foreign keys**: node rows cascade with their flowchart
//!
//! # Database Connection Patterns
//!
//! **Use `connect_with_timeout()` in async functions.** It sets the busy
//! timeout and foreign key enforcement on the new connection, so concurrent
//! writers wait instead of failing immediately with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use flowchart_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/flowchart.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Busy timeout applied to every connection, in milliseconds
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database service for managing the libsql database and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Enable WAL mode and foreign keys
    /// 4. Initialize the schema
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;
        tracing::info!(path = %service.db_path.display(), "Database ready");

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `flowchart`: one row per aggregate, unique natural `key`
    /// - `node`: one row per tree node, `ordinal` keeps pre-order position
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await
            .map_err(|e| DatabaseError::initialization_failed(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS flowchart (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                key TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                modified_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create flowchart table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS node (
                id TEXT PRIMARY KEY,
                internal_id TEXT NOT NULL,
                parent_id TEXT NOT NULL,
                flowchart_id TEXT NOT NULL,
                ordinal INTEGER NOT NULL,
                dragging BOOLEAN NOT NULL DEFAULT FALSE,
                selected BOOLEAN NOT NULL DEFAULT FALSE,
                position_absolute JSON NOT NULL,
                height INTEGER NOT NULL,
                width INTEGER NOT NULL,
                position JSON NOT NULL,
                data JSON NOT NULL,
                type TEXT NOT NULL DEFAULT '',
                UNIQUE (flowchart_id, internal_id),
                FOREIGN KEY (flowchart_id) REFERENCES flowchart(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to create node table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_node_flowchart ON node(flowchart_id, ordinal)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_node_flowchart': {}",
                e
            ))
        })?;

        // Flush the schema for fresh files so a second handle opened right away sees it
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a raw connection
    ///
    /// Prefer [`DatabaseService::connect_with_timeout`] in async code.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with busy timeout and foreign keys configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }
}
