//! Scene nodes and their behaviour hooks

use super::node_list::NodeList;
use super::tree::SceneTree;
use crate::foundation::collections::NodeKey;
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

bitflags::bitflags! {
    /// Lifecycle state bits of a [`Node`]
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Node takes part in updates and rendering
        const ENABLED   = 0b0000_0001;
        /// Node was destroyed and is waiting to be freed
        const DESTROYED = 0b0000_0010;
        /// Node is attached, through live lists, to the tree root
        const IN_TREE   = 0b0000_0100;
        /// `ready` has already fired
        const READY     = 0b0000_1000;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::ENABLED
    }
}

/// Capability tag a node registers at construction
///
/// Type lookups such as [`SceneTree::find_first_node_of_type`] match on these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKind(pub &'static str);

impl NodeKind {
    /// Tag name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Game logic attached to a node
///
/// Every hook has an empty default. Hooks get the whole tree plus the key of the node
/// they belong to, so they can look up and restructure the scene while they run.
#[allow(unused_variables)]
pub trait NodeBehavior {
    /// First time the node goes live inside the tree
    fn ready(&mut self, tree: &mut SceneTree, key: NodeKey) {}

    /// Node became reachable from the tree root
    fn on_added_to_scene(&mut self, tree: &mut SceneTree, key: NodeKey) {}

    /// Node stopped being reachable from the tree root
    fn on_removed_from_scene(&mut self, tree: &mut SceneTree, key: NodeKey) {}

    /// Runs before the update pass
    fn pre_update(&mut self, tree: &mut SceneTree, key: NodeKey, dt: Duration) {}

    /// Per-frame update
    fn update(&mut self, tree: &mut SceneTree, key: NodeKey, dt: Duration) {}

    /// Runs after the update pass
    fn post_update(&mut self, tree: &mut SceneTree, key: NodeKey, dt: Duration) {}

    /// Fixed-step update
    fn fixed_update(&mut self, tree: &mut SceneTree, key: NodeKey) {}

    /// Node is being destroyed, after all of its children
    fn on_destroy(&mut self, tree: &mut SceneTree, key: NodeKey) {}

    /// Node was enabled
    fn on_enabled(&mut self, tree: &mut SceneTree, key: NodeKey) {}

    /// Node was disabled
    fn on_disabled(&mut self, tree: &mut SceneTree, key: NodeKey) {}
}

/// A node in the scene tree
///
/// Build one with [`Node::new`] and the `with_*` methods, then hand it to
/// [`SceneTree::insert_node`]. Structure (parent, children, depth, position) is
/// managed by the tree.
pub struct Node {
    pub(crate) id: u64,
    name: String,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: NodeList,
    kinds: Vec<NodeKind>,
    pub(crate) tag: i32,
    pub(crate) flags: NodeFlags,
    update_interval: u32,
    pub(crate) depth: i32,
    pub(crate) pos: i32,
    pub(crate) behavior: Option<Box<dyn NodeBehavior>>,
}

impl Node {
    /// Create a detached, enabled node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            parent: None,
            children: NodeList::new(),
            kinds: Vec::new(),
            tag: 0,
            flags: NodeFlags::default(),
            update_interval: 1,
            depth: -1,
            pos: -1,
            behavior: None,
        }
    }

    /// Register a capability tag
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    /// Set the integer tag
    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }

    /// Only update every `interval` frames; zero never updates
    pub fn with_update_interval(mut self, interval: u32) -> Self {
        self.update_interval = interval;
        self
    }

    /// Attach behaviour
    pub fn with_behavior(mut self, behavior: impl NodeBehavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    /// Start disabled
    pub fn disabled(mut self) -> Self {
        self.flags.remove(NodeFlags::ENABLED);
        self
    }

    /// Tree-assigned id, unique within one tree
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child list
    pub fn children(&self) -> &NodeList {
        &self.children
    }

    /// Registered capability tags
    pub fn kinds(&self) -> &[NodeKind] {
        &self.kinds
    }

    /// Whether the node registered `kind`
    pub fn is_kind(&self, kind: NodeKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Integer tag
    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Lifecycle state bits
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the node is enabled
    pub fn enabled(&self) -> bool {
        self.flags.contains(NodeFlags::ENABLED)
    }

    /// Whether the node was destroyed
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(NodeFlags::DESTROYED)
    }

    /// Whether the node is reachable from the tree root through live lists
    pub fn inside_tree(&self) -> bool {
        self.flags.contains(NodeFlags::IN_TREE)
    }

    /// Frame divisor for update calls
    pub fn update_interval(&self) -> u32 {
        self.update_interval
    }

    /// Change the frame divisor
    pub fn set_update_interval(&mut self, interval: u32) {
        self.update_interval = interval;
    }

    /// Distance from the tree root (the root is 0, detached nodes are -1)
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// 1-based position among siblings, -1 when detached
    pub fn pos(&self) -> i32 {
        self.pos
    }

    /// Natural ordering: depth, then sibling position, then id
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        (self.depth, self.pos, self.id).cmp(&(other.depth, other.pos, other.id))
    }

    /// Whether a behaviour is attached
    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("kinds", &self.kinds)
            .field("tag", &self.tag)
            .field("flags", &self.flags)
            .field("update_interval", &self.update_interval)
            .field("depth", &self.depth)
            .field("pos", &self.pos)
            .field("children", &self.children.len())
            .finish()
    }
}
