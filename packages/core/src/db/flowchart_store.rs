//! FlowChartStore Trait - Persistence Abstraction
//!
//! Defines the operations the flowchart service needs from a backing store.
//! Writes replace the stored aggregate as a whole: the flowchart row and all
//! of its node rows change inside one transaction, or not at all.
//!
//! # Examples
//!
//! ```rust,no_run
//! use flowchart_core::db::{DatabaseService, Deadline, FlowChartStore, TursoFlowChartStore};
//! use flowchart_core::models::LabelData;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Arc::new(DatabaseService::new(PathBuf::from("./data/flowchart.db")).await?);
//!     let store: Arc<dyn FlowChartStore<LabelData>> = Arc::new(TursoFlowChartStore::new(db));
//!
//!     let deadline = Deadline::after(Duration::from_secs(5));
//!     let exists = store.flowchart_exists(&deadline, "onboarding").await?;
//!     println!("onboarding stored: {}", exists);
//!     Ok(())
//! }
//! ```

use crate::db::deadline::Deadline;
use crate::db::error::DatabaseError;
use crate::models::{BuildError, Edge, FlowChart, Payload, TreeNode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A stored node row: the node itself plus the parent id it was written with
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord<D> {
    pub node: TreeNode<D>,
    pub parent_id: String,
}

/// A stored flowchart as read back from the store, nodes in pre-order
#[derive(Debug, Clone, PartialEq)]
pub struct FlowChartRecord<D> {
    pub id: String,
    pub title: String,
    pub key: String,
    pub updated_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord<D>>,
}

impl<D> FlowChartRecord<D> {
    /// Parent→child edges recovered from the stored parent ids
    ///
    /// The root was stored with itself as parent (`"0"` → `"0"`); such
    /// self-referential pairs carry no edge.
    pub fn edges(&self) -> Vec<Edge> {
        self.nodes
            .iter()
            .filter(|record| record.parent_id != record.node.id)
            .map(|record| Edge::new(record.parent_id.as_str(), record.node.id.as_str()))
            .collect()
    }

    /// Rebuild the domain aggregate from the stored rows
    pub fn into_flowchart(self) -> Result<FlowChart<D>, BuildError> {
        let edges = self.edges();
        let nodes = self.nodes.into_iter().map(|record| record.node);
        let mut chart = FlowChart::build(self.title, self.key, nodes, &edges)?;
        chart.id = Some(self.id);
        chart.updated_at = Some(self.updated_at);
        Ok(chart)
    }
}

/// Abstraction layer for flowchart persistence
///
/// Every method takes the caller's [`Deadline`]; once it passes, the
/// operation stops, rolls back any open transaction and returns
/// [`DatabaseError::DeadlineExceeded`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single store can be shared by
/// concurrent request handlers.
#[async_trait]
pub trait FlowChartStore<D: Payload>: Send + Sync {
    /// Whether a flowchart with this key is stored; a miss is `Ok(false)`
    async fn flowchart_exists(&self, deadline: &Deadline, key: &str) -> Result<bool, DatabaseError>;

    /// Insert a new flowchart and all of its nodes in one transaction
    ///
    /// Returns the store-assigned surrogate id. Fails if the key is taken.
    async fn store_flowchart(
        &self,
        deadline: &Deadline,
        chart: &FlowChart<D>,
    ) -> Result<String, DatabaseError>;

    /// Replace the title and the whole node tree of an existing flowchart
    ///
    /// Runs in one transaction: update the flowchart row, delete every node
    /// row of the aggregate, insert the new nodes in pre-order. An update that
    /// matches no row fails with [`DatabaseError::FlowChartNotFound`].
    async fn update_flowchart(
        &self,
        deadline: &Deadline,
        chart: &FlowChart<D>,
    ) -> Result<String, DatabaseError>;

    /// Read a flowchart and its node rows by key
    async fn fetch_flowchart(
        &self,
        deadline: &Deadline,
        key: &str,
    ) -> Result<Option<FlowChartRecord<D>>, DatabaseError>;
}
