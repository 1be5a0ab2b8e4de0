//! Arena-backed N-ary Tree
//!
//! Nodes live in a flat vector owned by [`NodeTree`]. Family links (parent,
//! first/last child, previous/next sibling) are [`NodeHandle`] indices into
//! that vector, so the tree never holds owning or reference-counted pointers
//! between nodes.
//!
//! # Complexity
//!
//! - Appending a child: O(1) (the last child is tracked per node)
//! - Ancestor walks (`depth`, `get_root`, `parent_id`): O(depth)
//! - Lookup by node id: O(1) average
//!
//! # Examples
//!
//! ```
//! use flowchart_core::models::{NodeTree, TreeNode};
//!
//! let mut tree = NodeTree::new();
//! let root = tree.insert(TreeNode::new("0", "start")).unwrap();
//! let child = tree.insert(TreeNode::new("1", "step")).unwrap();
//! tree.add_child(root, child).unwrap();
//!
//! assert_eq!(tree.depth(child), 2);
//! assert_eq!(tree.parent_id(child), "0");
//! assert_eq!(tree.get_root(child), (root, 2));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Parent id reported for a root node, and the id reserved for the root of a flowchart
pub const ROOT_PARENT_ID: &str = "0";

/// Stable handle of a node inside one [`NodeTree`]
///
/// Handles are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Position of the node in its tree's insertion order
    pub fn index(self) -> usize {
        self.0
    }
}

/// 2D canvas coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A flowchart node: identity, payload and visual metadata
///
/// Structural links are owned by the [`NodeTree`] the node is inserted into.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<D> {
    /// Caller-assigned id, unique within a tree
    pub id: String,

    /// Opaque payload
    pub data: D,

    /// Type discriminator; empty means "default"
    pub node_type: String,

    pub position: Position,
    pub position_absolute: Position,
    pub width: i16,
    pub height: i16,
    pub selected: bool,
    pub dragging: bool,
}

impl<D> TreeNode<D> {
    /// Create a node with zeroed geometry and cleared UI flags
    pub fn new(id: impl Into<String>, data: D) -> Self {
        Self {
            id: id.into(),
            data,
            node_type: String::new(),
            position: Position::default(),
            position_absolute: Position::default(),
            width: 0,
            height: 0,
            selected: false,
            dragging: false,
        }
    }
}

/// Structural errors raised by [`NodeTree`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Node id must not be empty")]
    EmptyId,

    #[error("Duplicate node id: {id}")]
    DuplicateId { id: String },

    #[error("Unknown node handle: {0:?}")]
    UnknownHandle(NodeHandle),

    /// The would-be child already has a parent or siblings
    #[error("Node '{id}' is already attached to a tree")]
    AlreadyAttached { id: String },

    #[error("Attaching '{child}' under '{parent}' would create a cycle")]
    WouldCycle { parent: String, child: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
    parent: Option<NodeHandle>,
    first_child: Option<NodeHandle>,
    last_child: Option<NodeHandle>,
    previous_sibling: Option<NodeHandle>,
    next_sibling: Option<NodeHandle>,
}

/// Arena of [`TreeNode`]s and their family links
///
/// An arena may hold several detached roots while a tree is being assembled;
/// [`NodeTree::add_child`] joins them.
#[derive(Debug, Clone)]
pub struct NodeTree<D> {
    nodes: Vec<TreeNode<D>>,
    links: Vec<Links>,
    index: HashMap<String, NodeHandle>,
}

impl<D> Default for NodeTree<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> NodeTree<D> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            links: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a detached node to the arena
    ///
    /// # Errors
    ///
    /// - [`TreeError::EmptyId`] if the node id is empty
    /// - [`TreeError::DuplicateId`] if a node with the same id is already present
    pub fn insert(&mut self, node: TreeNode<D>) -> Result<NodeHandle, TreeError> {
        if node.id.is_empty() {
            return Err(TreeError::EmptyId);
        }
        if self.index.contains_key(&node.id) {
            return Err(TreeError::DuplicateId { id: node.id });
        }

        let handle = NodeHandle(self.nodes.len());
        self.index.insert(node.id.clone(), handle);
        self.nodes.push(node);
        self.links.push(Links::default());
        Ok(handle)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&TreeNode<D>> {
        self.nodes.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut TreeNode<D>> {
        self.nodes.get_mut(handle.0)
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        handle.0 < self.nodes.len()
    }

    /// Look up a node handle by node id
    pub fn handle_of(&self, id: &str) -> Option<NodeHandle> {
        self.index.get(id).copied()
    }

    /// All handles in insertion order
    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        (0..self.nodes.len()).map(NodeHandle)
    }

    /// Append `child` as the last child of `parent`
    ///
    /// Only a root (no parent, no siblings) can be attached. Nothing is
    /// mutated when an error is returned.
    ///
    /// # Errors
    ///
    /// - [`TreeError::UnknownHandle`] if either handle is not from this tree
    /// - [`TreeError::AlreadyAttached`] if `child` is not a root
    /// - [`TreeError::WouldCycle`] if `child` is `parent` or one of its ancestors
    pub fn add_child(
        &mut self,
        parent: NodeHandle,
        child: NodeHandle,
    ) -> Result<NodeHandle, TreeError> {
        self.ensure(parent)?;
        self.ensure(child)?;

        if !self.is_root(child) {
            return Err(TreeError::AlreadyAttached {
                id: self.nodes[child.0].id.clone(),
            });
        }
        // A detached child can only close a cycle by being the top of parent's
        // chain, and a childless one only by being parent itself.
        let closes_cycle = if self.is_leaf(child) {
            child == parent
        } else {
            self.get_root(parent).0 == child
        };
        if closes_cycle {
            return Err(TreeError::WouldCycle {
                parent: self.nodes[parent.0].id.clone(),
                child: self.nodes[child.0].id.clone(),
            });
        }

        let previous_last = self.links[parent.0].last_child;
        let child_links = &mut self.links[child.0];
        child_links.parent = Some(parent);
        child_links.previous_sibling = previous_last;

        match previous_last {
            Some(last) => self.links[last.0].next_sibling = Some(child),
            None => self.links[parent.0].first_child = Some(child),
        }
        self.links[parent.0].last_child = Some(child);

        Ok(child)
    }

    /// A node is a root iff it has no parent and no siblings
    pub fn is_root(&self, handle: NodeHandle) -> bool {
        let links = self.links_of(handle);
        links.parent.is_none() && links.previous_sibling.is_none() && links.next_sibling.is_none()
    }

    pub fn is_leaf(&self, handle: NodeHandle) -> bool {
        self.links_of(handle).first_child.is_none()
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.links_of(handle).parent
    }

    pub fn first_child(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.links_of(handle).first_child
    }

    pub fn last_child(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.links_of(handle).last_child
    }

    pub fn next_sibling(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.links_of(handle).next_sibling
    }

    pub fn previous_sibling(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.links_of(handle).previous_sibling
    }

    /// Children of `handle` in insertion order
    pub fn children(&self, handle: NodeHandle) -> Children<'_, D> {
        Children {
            tree: self,
            next: self.first_child(handle),
        }
    }

    /// Id of the parent node, or [`ROOT_PARENT_ID`] for a parentless node
    pub fn parent_id(&self, handle: NodeHandle) -> &str {
        self.parent(handle)
            .and_then(|parent| self.get(parent))
            .map(|node| node.id.as_str())
            .unwrap_or(ROOT_PARENT_ID)
    }

    /// Number of nodes on the path from the root to `handle`, inclusive
    pub fn depth(&self, handle: NodeHandle) -> usize {
        self.get_root(handle).1
    }

    /// Top of the parent chain of `handle`, together with the depth of `handle`
    pub fn get_root(&self, handle: NodeHandle) -> (NodeHandle, usize) {
        let mut current = handle;
        let mut depth = 1;
        while let Some(parent) = self.parent(current) {
            current = parent;
            depth += 1;
        }
        (current, depth)
    }

    fn ensure(&self, handle: NodeHandle) -> Result<(), TreeError> {
        if self.contains(handle) {
            Ok(())
        } else {
            Err(TreeError::UnknownHandle(handle))
        }
    }

    // Handles from another tree read as detached nodes.
    fn links_of(&self, handle: NodeHandle) -> Links {
        self.links.get(handle.0).copied().unwrap_or_default()
    }
}

/// Iterator over the children of one node
pub struct Children<'a, D> {
    tree: &'a NodeTree<D>,
    next: Option<NodeHandle>,
}

impl<D> Iterator for Children<'_, D> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Level-by-level rendering of every root in the arena
///
/// Each level is one line of `(id: data)` entries separated by tabs, followed
/// by a blank line.
impl<D: fmt::Debug> fmt::Display for NodeTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for root in self.handles().filter(|h| self.is_root(*h)) {
            let mut level = vec![root];
            while !level.is_empty() {
                let rendered: Vec<String> = level
                    .iter()
                    .map(|h| {
                        let node = &self.nodes[h.0];
                        format!("({}: {:?})", node.id, node.data)
                    })
                    .collect();
                writeln!(f, "{}", rendered.join("\t"))?;
                writeln!(f)?;
                level = level.iter().flat_map(|h| self.children(*h)).collect();
            }
        }
        Ok(())
    }
}
