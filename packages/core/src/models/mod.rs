//! Data Models
//!
//! This module contains the in-memory flowchart representation:
//!
//! - `NodeTree` / `TreeNode` - arena-backed N-ary tree with handle links
//! - Traversal engine (pre-, in-, post- and level-order)
//! - `build_tree` - flat nodes + edges to a validated rooted tree
//! - `FlowChart` - the persisted aggregate

mod builder;
mod flowchart;
mod traverse;
mod tree;

pub use builder::{build_tree, BuildError, BuiltTree};
pub use flowchart::{Edge, FlowChart, LabelData, LinearNode, Payload, UnstructuredData};
pub use traverse::{DepthLimit, Traversal, TraverseError, TraverseFlags, TraverseOrder};
pub use tree::{Children, NodeHandle, NodeTree, Position, TreeError, TreeNode, ROOT_PARENT_ID};
