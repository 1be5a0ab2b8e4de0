//! Flowchart Core
//!
//! Persistence and retrieval of hierarchical diagrams ("flowcharts"): a tree
//! of nodes with positional metadata, submitted as a flat node list plus
//! parent→child edges, rebuilt into an in-memory tree and written to libsql
//! as a whole.
//!
//! # Architecture
//!
//! - **Arena tree**: nodes live in a `NodeTree`, linked by stable handles
//! - **Traversal engine**: pre-, in-, post- and level-order with depth limits,
//!   leaf filters and early termination
//! - **Transactional replace**: every edit swaps the stored tree inside one
//!   transaction; a failure leaves the previous tree untouched
//!
//! # Modules
//!
//! - [`models`] - Tree, traversal, tree builder and the `FlowChart` aggregate
//! - [`transport`] - JSON shapes exchanged with editors
//! - [`db`] - Database layer with libsql integration
//! - [`services`] - `FlowChartService` (edit and fetch)

pub mod db;
pub mod models;
pub mod services;
pub mod transport;

// Re-export commonly used types
pub use db::{DatabaseError, DatabaseService, Deadline, FlowChartStore, TursoFlowChartStore};
pub use models::*;
pub use services::*;
pub use transport::{FlowChartDto, NodeDto};
