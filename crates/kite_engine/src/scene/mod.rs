//! Scene tree with deferred child lists
//!
//! - [`Node`] and [`NodeBehavior`] hold per-node state and game logic
//! - [`NodeList`] queues child additions and removals until the owner updates
//! - [`SceneTree`] owns the nodes and drives the frame passes

mod node;
mod node_list;
mod tree;

pub use node::{Node, NodeBehavior, NodeFlags, NodeKind};
pub use node_list::{ListChanges, NodeComparator, NodeList, Removal};
pub use tree::SceneTree;
