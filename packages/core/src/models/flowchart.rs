//! Flowchart Aggregate
//!
//! A [`FlowChart`] is the unit of persistence: a title, a caller-assigned key
//! and one rooted node tree. Every write replaces the whole stored tree.

use crate::models::builder::{build_tree, check_rooted, BuildError};
use crate::models::traverse::{DepthLimit, TraverseFlags, TraverseOrder};
use crate::models::tree::{NodeHandle, NodeTree, TreeNode};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::ops::ControlFlow;

/// Anything that can ride in a node and round-trip through the store as JSON
pub trait Payload: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {}

/// Structured payload: a node caption
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelData {
    #[serde(default)]
    pub label: String,
}

impl LabelData {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// Unstructured payload: whatever map the client sent
pub type UnstructuredData = serde_json::Value;

/// Parent→child link between two nodes
///
/// Derived edges use the child id as the edge id; each child has exactly one
/// parent, so the id is unique within a chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            id: target.clone(),
            source: source.into(),
            target,
        }
    }
}

/// A node in pre-order position, paired with its parent id
#[derive(Debug, Clone, Copy)]
pub struct LinearNode<'a, D> {
    pub node: &'a TreeNode<D>,
    pub parent_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct FlowChart<D> {
    /// Store-assigned surrogate id; `None` until persisted
    pub id: Option<String>,
    pub title: String,
    pub key: String,
    /// Last modification time reported by the store
    pub updated_at: Option<DateTime<Utc>>,
    tree: NodeTree<D>,
    root: Option<NodeHandle>,
}

impl<D> FlowChart<D> {
    /// Wrap an already assembled tree
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingKey`] for an empty key, otherwise the same
    /// rootedness checks [`build_tree`] applies.
    pub fn new(
        title: impl Into<String>,
        key: impl Into<String>,
        tree: NodeTree<D>,
        root: Option<NodeHandle>,
    ) -> Result<Self, BuildError> {
        let key = key.into();
        if key.is_empty() {
            return Err(BuildError::MissingKey);
        }
        check_rooted(&tree, root)?;

        Ok(Self {
            id: None,
            title: title.into(),
            key,
            updated_at: None,
            tree,
            root,
        })
    }

    /// Build from a flat node list and parent→child edges
    pub fn build<I>(
        title: impl Into<String>,
        key: impl Into<String>,
        nodes: I,
        edges: &[Edge],
    ) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = TreeNode<D>>,
    {
        let key = key.into();
        if key.is_empty() {
            return Err(BuildError::MissingKey);
        }
        let built = build_tree(nodes, edges)?;

        Ok(Self {
            id: None,
            title: title.into(),
            key,
            updated_at: None,
            tree: built.tree,
            root: built.root,
        })
    }

    /// A chart with no nodes; storing it empties the aggregate
    pub fn empty(title: impl Into<String>, key: impl Into<String>) -> Result<Self, BuildError> {
        Self::new(title, key, NodeTree::new(), None)
    }

    pub fn tree(&self) -> &NodeTree<D> {
        &self.tree
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    pub fn root_node(&self) -> Option<&TreeNode<D>> {
        self.root.and_then(|root| self.tree.get(root))
    }

    pub fn node_count(&self) -> usize {
        self.tree.len()
    }

    /// Every node in pre-order with its parent id; the root reports `"0"`
    pub fn linearize(&self) -> Vec<LinearNode<'_, D>> {
        let mut linear = Vec::with_capacity(self.tree.len());
        if let Some(root) = self.root {
            // The root was validated on construction, so the walk cannot fail.
            let _ = self.tree.traverse(
                root,
                TraverseOrder::PreOrder,
                TraverseFlags::ALL,
                DepthLimit::Unbounded,
                |handle, node| {
                    linear.push(LinearNode {
                        node,
                        parent_id: self.tree.parent_id(handle),
                    });
                    ControlFlow::Continue(())
                },
            );
        }
        linear
    }

    /// Parent→child edges in pre-order of the child
    pub fn edges(&self) -> Vec<Edge> {
        // Pre-order starts with the root, which has no incoming edge
        self.linearize()
            .into_iter()
            .skip(1)
            .map(|linear| Edge::new(linear.parent_id, linear.node.id.as_str()))
            .collect()
    }
}
