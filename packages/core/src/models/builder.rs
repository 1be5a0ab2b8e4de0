//! Tree Builder
//!
//! Turns an order-independent flat list of nodes plus parent→child edges into
//! a validated, rooted [`NodeTree`].
//!
//! The root of a flowchart is the node with the reserved id `"0"`
//! ([`ROOT_PARENT_ID`]); edges whose source is `"0"` hang top-level steps
//! off it. Every other node must be reachable from the root.

use crate::models::flowchart::Edge;
use crate::models::traverse::{DepthLimit, TraverseError, TraverseFlags, TraverseOrder};
use crate::models::tree::{NodeHandle, NodeTree, TreeError, TreeNode, ROOT_PARENT_ID};
use std::ops::ControlFlow;
use thiserror::Error;

/// Reasons a node/edge list cannot be turned into a flowchart tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Flowchart key must not be empty")]
    MissingKey,

    #[error("Duplicate node id: {id}")]
    DuplicateNode { id: String },

    /// An edge names a source node that is not in the node list
    #[error("Parent not found: {id}")]
    ParentNotFound { id: String },

    /// An edge names a target node that is not in the node list
    #[error("Child not found: {id}")]
    ChildNotFound { id: String },

    #[error("Node id \"0\" is reserved for the root and cannot be a child")]
    ReservedRootId,

    #[error("Root node must have id \"0\", found '{id}'")]
    RootIdMismatch { id: String },

    #[error("No root: no edge starts at node \"0\"")]
    NoRoot,

    #[error("Node '{id}' is not reachable from the root")]
    Disconnected { id: String },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Traverse(#[from] TraverseError),
}

/// Output of [`build_tree`]: the arena and its root (`None` for an empty chart)
#[derive(Debug, Clone)]
pub struct BuiltTree<D> {
    pub tree: NodeTree<D>,
    pub root: Option<NodeHandle>,
}

/// Build a rooted tree from nodes and parent→child edges
///
/// Edges are applied in order; each appends its target as the last child of
/// its source, so sibling order follows edge order.
///
/// A node list with no edges is accepted when it is empty (empty chart) or
/// consists of the root node `"0"` alone.
///
/// # Errors
///
/// See [`BuildError`]; the first problem found is reported.
///
/// # Examples
///
/// ```
/// use flowchart_core::models::{build_tree, Edge, TreeNode};
///
/// let nodes = vec![TreeNode::new("0", ()), TreeNode::new("1", ()), TreeNode::new("2", ())];
/// let edges = vec![Edge::new("0", "1"), Edge::new("0", "2")];
/// let built = build_tree(nodes, &edges).unwrap();
///
/// let root = built.root.unwrap();
/// assert_eq!(built.tree.get(root).unwrap().id, "0");
/// assert_eq!(built.tree.children(root).count(), 2);
/// ```
pub fn build_tree<D, I>(nodes: I, edges: &[Edge]) -> Result<BuiltTree<D>, BuildError>
where
    I: IntoIterator<Item = TreeNode<D>>,
{
    let nodes = nodes.into_iter();
    let mut tree = NodeTree::with_capacity(nodes.size_hint().0);

    for node in nodes {
        tree.insert(node).map_err(|e| match e {
            TreeError::DuplicateId { id } => BuildError::DuplicateNode { id },
            other => BuildError::Tree(other),
        })?;
    }

    let mut root = None;
    for edge in edges {
        let parent = tree
            .handle_of(&edge.source)
            .ok_or_else(|| BuildError::ParentNotFound {
                id: edge.source.clone(),
            })?;
        if edge.target == ROOT_PARENT_ID {
            return Err(BuildError::ReservedRootId);
        }
        let child = tree
            .handle_of(&edge.target)
            .ok_or_else(|| BuildError::ChildNotFound {
                id: edge.target.clone(),
            })?;

        tree.add_child(parent, child)?;

        if edge.source == ROOT_PARENT_ID {
            root = Some(parent);
        }
    }

    let root = match root {
        Some(root) => Some(root),
        None if tree.is_empty() => None,
        None => match tree.handle_of(ROOT_PARENT_ID) {
            Some(lone) if tree.len() == 1 => Some(lone),
            _ => return Err(BuildError::NoRoot),
        },
    };

    check_rooted(&tree, root)?;
    Ok(BuiltTree { tree, root })
}

/// Verify that `root` is the `"0"` node at the top of the tree and that every
/// node in the arena hangs below it
pub(crate) fn check_rooted<D>(tree: &NodeTree<D>, root: Option<NodeHandle>) -> Result<(), BuildError> {
    let Some(root) = root else {
        return match tree.handles().next().and_then(|h| tree.get(h)) {
            Some(stray) => Err(BuildError::Disconnected {
                id: stray.id.clone(),
            }),
            None => Ok(()),
        };
    };

    let node = tree.get(root).ok_or(TreeError::UnknownHandle(root))?;
    if node.id != ROOT_PARENT_ID {
        return Err(BuildError::RootIdMismatch {
            id: node.id.clone(),
        });
    }
    if !tree.is_root(root) {
        return Err(BuildError::ReservedRootId);
    }

    let mut reachable = vec![false; tree.len()];
    tree.traverse(
        root,
        TraverseOrder::PreOrder,
        TraverseFlags::ALL,
        DepthLimit::Unbounded,
        |handle, _| {
            reachable[handle.index()] = true;
            ControlFlow::Continue(())
        },
    )?;

    match tree.handles().find(|h| !reachable[h.index()]) {
        Some(stray) => Err(BuildError::Disconnected {
            id: tree.get(stray).map(|n| n.id.clone()).unwrap_or_default(),
        }),
        None => Ok(()),
    }
}
