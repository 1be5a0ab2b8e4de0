//! Traversal Engine
//!
//! Walks a [`NodeTree`] from any start node in one of four orders, optionally
//! bounded in depth and filtered to leaves or internal nodes. The visitor can
//! stop the walk at any node by returning [`ControlFlow::Break`].
//!
//! # Orders
//!
//! - **Pre-order**: node, then each child subtree left to right
//! - **In-order**: first child subtree, node, remaining child subtrees
//! - **Post-order**: each child subtree left to right, then node
//! - **Level-order**: breadth-first, left to right within a level
//!
//! # Examples
//!
//! ```
//! use flowchart_core::models::{
//!     DepthLimit, NodeTree, TraverseFlags, TraverseOrder, Traversal, TreeNode,
//! };
//! use std::ops::ControlFlow;
//!
//! let mut tree = NodeTree::new();
//! let root = tree.insert(TreeNode::new("0", ())).unwrap();
//! let a = tree.insert(TreeNode::new("a", ())).unwrap();
//! tree.add_child(root, a).unwrap();
//!
//! let mut seen = Vec::new();
//! let outcome = tree
//!     .traverse(root, TraverseOrder::PostOrder, TraverseFlags::ALL, DepthLimit::Unbounded, |_, node| {
//!         seen.push(node.id.clone());
//!         ControlFlow::Continue(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(outcome, Traversal::Completed);
//! assert_eq!(seen, vec!["a", "0"]);
//! ```

use crate::models::tree::{NodeHandle, NodeTree, TreeNode};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use thiserror::Error;

/// Rejected traversal parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraverseError {
    #[error("Invalid traversal order: {0}")]
    InvalidOrder(i32),

    #[error("Invalid traversal flags: {0:#x}")]
    InvalidFlags(u8),

    /// Depth must be -1 (unbounded) or positive
    #[error("Invalid traversal depth: {0}")]
    InvalidDepth(i32),

    #[error("Traversal start node is not part of this tree: {0:?}")]
    UnknownHandle(NodeHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraverseOrder {
    InOrder,
    PreOrder,
    PostOrder,
    LevelOrder,
}

impl TryFrom<i32> for TraverseOrder {
    type Error = TraverseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::InOrder),
            1 => Ok(Self::PreOrder),
            2 => Ok(Self::PostOrder),
            3 => Ok(Self::LevelOrder),
            other => Err(TraverseError::InvalidOrder(other)),
        }
    }
}

/// Which node kinds the visitor is invoked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraverseFlags(u8);

impl TraverseFlags {
    /// Nodes without children
    pub const LEAVES: Self = Self(0b01);
    /// Nodes with at least one child
    pub const NON_LEAVES: Self = Self(0b10);
    pub const ALL: Self = Self(0b11);

    const MASK: u8 = 0b11;

    pub fn from_bits(bits: u8) -> Result<Self, TraverseError> {
        if bits & !Self::MASK != 0 {
            return Err(TraverseError::InvalidFlags(bits));
        }
        Ok(Self(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    fn admits(self, is_leaf: bool) -> bool {
        if is_leaf {
            self.contains(Self::LEAVES)
        } else {
            self.contains(Self::NON_LEAVES)
        }
    }
}

impl std::ops::BitOr for TraverseFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// How many levels below (and including) the start node are visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthLimit {
    Unbounded,
    /// Visit nodes at distance `0..levels` from the start node
    Levels(NonZeroUsize),
}

impl DepthLimit {
    /// Whether nodes at `distance` from the start are within the limit
    fn allows(self, distance: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Levels(levels) => distance < levels.get(),
        }
    }
}

impl TryFrom<i32> for DepthLimit {
    type Error = TraverseError;

    /// `-1` means unbounded; `0` and anything below `-1` are rejected
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value == -1 {
            return Ok(Self::Unbounded);
        }
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::Levels)
            .ok_or(TraverseError::InvalidDepth(value))
    }
}

/// How a traversal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    Completed,
    /// The visitor broke out early
    Stopped,
}

impl<D> NodeTree<D> {
    /// Walk the subtree rooted at `start`
    ///
    /// `visit` is called once per admitted node. Returning
    /// [`ControlFlow::Break`] stops the walk immediately and the result is
    /// [`Traversal::Stopped`]; stopping early is not an error.
    ///
    /// # Errors
    ///
    /// [`TraverseError::UnknownHandle`] if `start` is not part of this tree.
    /// Malformed raw parameters are rejected earlier by
    /// [`TraverseOrder::try_from`], [`TraverseFlags::from_bits`] and
    /// [`DepthLimit::try_from`].
    pub fn traverse<'a, F>(
        &'a self,
        start: NodeHandle,
        order: TraverseOrder,
        flags: TraverseFlags,
        depth: DepthLimit,
        visit: F,
    ) -> Result<Traversal, TraverseError>
    where
        F: FnMut(NodeHandle, &'a TreeNode<D>) -> ControlFlow<()>,
    {
        if !self.contains(start) {
            return Err(TraverseError::UnknownHandle(start));
        }

        let mut walker = Walker {
            tree: self,
            flags,
            depth,
            visit,
        };
        let flow = match order {
            TraverseOrder::LevelOrder => walker.level_order(start),
            depth_first => walker.depth_first(start, depth_first),
        };

        Ok(match flow {
            ControlFlow::Continue(()) => Traversal::Completed,
            ControlFlow::Break(()) => Traversal::Stopped,
        })
    }

    /// Handles of the subtree rooted at `start` in pre-order
    pub fn pre_order(&self, start: NodeHandle) -> Result<Vec<NodeHandle>, TraverseError> {
        let mut handles = Vec::new();
        self.traverse(
            start,
            TraverseOrder::PreOrder,
            TraverseFlags::ALL,
            DepthLimit::Unbounded,
            |handle, _| {
                handles.push(handle);
                ControlFlow::Continue(())
            },
        )?;
        Ok(handles)
    }
}

struct Walker<'a, D, F> {
    tree: &'a NodeTree<D>,
    flags: TraverseFlags,
    depth: DepthLimit,
    visit: F,
}

/// One node on the depth-first stack
struct Frame {
    handle: NodeHandle,
    distance: usize,
    next_child: Option<NodeHandle>,
    descended: bool,
    emitted: bool,
}

impl<'a, D, F> Walker<'a, D, F>
where
    F: FnMut(NodeHandle, &'a TreeNode<D>) -> ControlFlow<()>,
{
    fn emit(&mut self, handle: NodeHandle) -> ControlFlow<()> {
        let tree = self.tree;
        match tree.get(handle) {
            Some(node) if self.flags.admits(tree.is_leaf(handle)) => (self.visit)(handle, node),
            _ => ControlFlow::Continue(()),
        }
    }

    // Children are only descended into while the next level is within the limit.
    fn descend(&self, distance: usize) -> bool {
        self.depth.allows(distance + 1)
    }

    fn frame(&self, handle: NodeHandle, distance: usize) -> Frame {
        Frame {
            handle,
            distance,
            next_child: if self.descend(distance) {
                self.tree.first_child(handle)
            } else {
                None
            },
            descended: false,
            emitted: false,
        }
    }

    /// Pre-, in- and post-order on an explicit stack, so tree depth is not
    /// bounded by the thread's stack size
    fn depth_first(&mut self, start: NodeHandle, order: TraverseOrder) -> ControlFlow<()> {
        let tree = self.tree;
        let mut stack = vec![self.frame(start, 0)];

        while let Some(frame) = stack.last_mut() {
            let due = !frame.emitted
                && match order {
                    TraverseOrder::PreOrder => true,
                    TraverseOrder::InOrder => frame.descended || frame.next_child.is_none(),
                    _ => frame.next_child.is_none(),
                };
            if due {
                frame.emitted = true;
                let handle = frame.handle;
                self.emit(handle)?;
                continue;
            }

            match frame.next_child {
                Some(child) => {
                    frame.next_child = tree.next_sibling(child);
                    frame.descended = true;
                    let distance = frame.distance + 1;
                    let next = self.frame(child, distance);
                    stack.push(next);
                }
                None => {
                    stack.pop();
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn level_order(&mut self, start: NodeHandle) -> ControlFlow<()> {
        let tree = self.tree;
        let mut queue = VecDeque::from([(start, 0usize)]);
        while let Some((handle, distance)) = queue.pop_front() {
            self.emit(handle)?;
            if self.descend(distance) {
                queue.extend(tree.children(handle).map(|child| (child, distance + 1)));
            }
        }
        ControlFlow::Continue(())
    }
}
