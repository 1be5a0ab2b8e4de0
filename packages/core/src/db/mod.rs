//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `FlowChartStore` abstraction and its libsql implementation
//! - Caller deadlines for every store operation
//!
//! Flowcharts are written by transactional replace: the aggregate's rows are
//! swapped as a whole inside one transaction, so readers never observe a
//! partially written tree.

mod database;
mod deadline;
mod error;
mod flowchart_store;
mod turso_store;

pub use database::DatabaseService;
pub use deadline::Deadline;
pub use error::DatabaseError;
pub use flowchart_store::{FlowChartRecord, FlowChartStore, NodeRecord};
pub use turso_store::TursoFlowChartStore;
