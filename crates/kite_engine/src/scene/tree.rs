//! Scene tree
//!
//! Owns every [`Node`] in one arena, drives the per-frame passes and fires the
//! lifecycle hooks on [`NodeBehavior`]. Child lists defer their mutations, so hooks are
//! free to add, remove and destroy nodes while a pass is walking the tree.

use super::node::{Node, NodeBehavior, NodeFlags, NodeKind};
use super::node_list::{ListChanges, NodeComparator, NodeList, Removal};
use crate::foundation::collections::{NodeArena, NodeKey};
use crate::foundation::logging::{debug, trace, warn};
use std::fmt::Write as _;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Pass {
    PreUpdate(Duration),
    Update(Duration),
    PostUpdate(Duration),
    Fixed,
}

/// Hooks that can reach a node while one of its own hooks is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Ready,
    AddedToScene,
    RemovedFromScene,
    Destroy,
    Enabled,
    Disabled,
}

impl Lifecycle {
    fn dispatch(self, behavior: &mut dyn NodeBehavior, tree: &mut SceneTree, key: NodeKey) {
        match self {
            Self::Ready => behavior.ready(tree, key),
            Self::AddedToScene => behavior.on_added_to_scene(tree, key),
            Self::RemovedFromScene => behavior.on_removed_from_scene(tree, key),
            Self::Destroy => behavior.on_destroy(tree, key),
            Self::Enabled => behavior.on_enabled(tree, key),
            Self::Disabled => behavior.on_disabled(tree, key),
        }
    }
}

/// Tree of nodes under a single root
#[derive(Debug)]
pub struct SceneTree {
    nodes: NodeArena<Node>,
    root: NodeKey,
    next_id: u64,
    /// Nodes whose behaviour is checked out by a running hook
    busy: Vec<NodeKey>,
    /// Lifecycle hooks held back until the busy node's running hook returns
    deferred: Vec<(NodeKey, Lifecycle)>,
}

impl SceneTree {
    /// Create a tree holding only the root node
    pub fn new() -> Self {
        let mut root = Node::new("root");
        root.depth = 0;
        root.pos = 0;
        root.flags = NodeFlags::ENABLED | NodeFlags::IN_TREE | NodeFlags::READY;

        let mut nodes = NodeArena::with_key();
        let root = nodes.insert(root);
        Self {
            nodes,
            root,
            next_id: 1,
            busy: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Root node key
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Look up a node
    pub fn get(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Look up a node mutably
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    /// Whether `key` still refers to a node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root is never freed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Take ownership of a detached node
    pub fn insert_node(&mut self, mut node: Node) -> NodeKey {
        node.id = self.next_id;
        self.next_id += 1;
        node.parent = None;
        node.depth = -1;
        node.pos = -1;
        node.flags.remove(NodeFlags::DESTROYED | NodeFlags::IN_TREE | NodeFlags::READY);
        node.children = NodeList::new();
        self.nodes.insert(node)
    }

    /// Create a detached node without behaviour
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeKey {
        self.insert_node(Node::new(name))
    }

    /// Create a detached node with behaviour
    pub fn create_node_with(&mut self, name: impl Into<String>, behavior: impl NodeBehavior + 'static) -> NodeKey {
        self.insert_node(Node::new(name).with_behavior(behavior))
    }

    /// Queue `child` to go live at the end of `parent`'s children
    ///
    /// A child that already has another parent is detached from it first.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        self.attach(parent, child, None)
    }

    /// Queue `child` to go live at `index` among `parent`'s children
    pub fn add_child_at(&mut self, parent: NodeKey, child: NodeKey, index: usize) -> bool {
        self.attach(parent, child, Some(index))
    }

    fn attach(&mut self, parent: NodeKey, child: NodeKey, index: Option<usize>) -> bool {
        if parent == child {
            warn!("A node cannot be its own child.");
            return false;
        }
        let (Some(parent_node), Some(child_node)) = (self.nodes.get(parent), self.nodes.get(child)) else {
            warn!("Cannot attach {child:?} to {parent:?}: node not found.");
            return false;
        };
        if parent_node.is_destroyed() || child_node.is_destroyed() {
            warn!("Cannot attach {child:?} to {parent:?}: node was destroyed.");
            return false;
        }
        if child == self.root || self.is_ancestor(child, parent) {
            warn!("Cannot attach {child:?} to {parent:?}: it would create a cycle.");
            return false;
        }

        let old_parent = child_node.parent;
        if let Some(old) = old_parent.filter(|old| *old != parent) {
            self.detach(old, child);
        }

        let queued = match self.nodes.get_mut(parent) {
            Some(node) => match index {
                Some(index) => node.children.add_at(child, index),
                None => node.children.add(child),
            },
            None => false,
        };
        if !queued {
            return false;
        }

        let depth = self.nodes.get(parent).map_or(-1, |node| node.depth + 1);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        self.set_depth(child, depth);
        self.renumber(parent);
        true
    }

    fn detach(&mut self, parent: NodeKey, child: NodeKey) -> Removal {
        let removal = self
            .nodes
            .get_mut(parent)
            .map_or(Removal::Ignored, |node| node.children.remove(child));
        if removal == Removal::Dropped {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
                node.depth = -1;
                node.pos = -1;
            }
        }
        removal
    }

    /// Queue `child` for removal from `parent`
    ///
    /// The node stays in the arena, detached, and can be added again later.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        if self.nodes.get(child).and_then(Node::parent) != Some(parent) {
            warn!("Cannot remove {child:?}: it is not a child of {parent:?}.");
            return false;
        }
        self.detach(parent, child) != Removal::Ignored
    }

    /// Move a live child to `index`
    pub fn move_child(&mut self, parent: NodeKey, child: NodeKey, index: usize) -> bool {
        self.reorder(parent, |list| list.move_to(child, index))
    }

    /// Swap two live children
    pub fn swap_children(&mut self, parent: NodeKey, a: NodeKey, b: NodeKey) -> bool {
        self.reorder(parent, |list| list.swap(a, b))
    }

    /// Move a live child to the front
    pub fn send_child_to_top(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        self.reorder(parent, |list| list.send_to_top(child))
    }

    /// Move a live child to the back
    pub fn send_child_to_bottom(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        self.reorder(parent, |list| list.send_to_bottom(child))
    }

    fn reorder(&mut self, parent: NodeKey, action: impl FnOnce(&mut NodeList) -> bool) -> bool {
        let moved = self
            .nodes
            .get_mut(parent)
            .is_some_and(|node| action(&mut node.children));
        if moved {
            self.renumber(parent);
        }
        moved
    }

    /// Install or clear the render-order comparator of `parent`'s children
    pub fn set_child_sort(&mut self, parent: NodeKey, sort: Option<NodeComparator>) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.set_sort(sort);
        }
    }

    /// Change a node's tag, keeping its parent's tag index current
    pub fn set_tag(&mut self, key: NodeKey, tag: i32) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        let old = std::mem::replace(&mut node.tag, tag);
        if let Some(parent) = node.parent {
            self.with_children(parent, |list, arena| list.retag(key, old, tag, arena));
        }
    }

    /// Enable or disable a node and its whole subtree
    ///
    /// Children are switched first; each node whose state changed gets `on_enabled` or
    /// `on_disabled`.
    pub fn set_enabled(&mut self, key: NodeKey, enabled: bool) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        if node.is_destroyed() {
            return;
        }
        let children: Vec<_> = node.children.iter_all().collect();
        for child in children {
            self.set_enabled(child, enabled);
        }

        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if node.enabled() == enabled {
            return;
        }
        node.flags.set(NodeFlags::ENABLED, enabled);
        self.fire(key, if enabled { Lifecycle::Enabled } else { Lifecycle::Disabled });
    }

    /// Destroy a node and everything below it
    ///
    /// Safe to call more than once. The node is disabled and its children are destroyed
    /// one by one before `on_destroy` fires. It is then detached from its parent; a node
    /// that was live there is freed when the parent's list next updates, anything else is
    /// freed at once.
    pub fn destroy(&mut self, key: NodeKey) {
        if key == self.root {
            warn!("The root node cannot be destroyed.");
            return;
        }
        let Some(node) = self.nodes.get_mut(key) else {
            trace!("Ignoring destroy of freed node {key:?}");
            return;
        };
        if node.is_destroyed() {
            trace!("Ignoring destroy of already destroyed node {key:?}");
            return;
        }
        node.flags.insert(NodeFlags::DESTROYED);
        node.flags.remove(NodeFlags::ENABLED);
        debug!("Destroying node '{}'", node.name());

        self.destroy_children_now(key);
        self.fire(key, Lifecycle::Destroy);

        let parent = self.nodes.get(key).and_then(Node::parent);
        let removal = parent.map_or(Removal::Ignored, |parent| self.detach(parent, key));
        if removal != Removal::Queued {
            self.free(key);
        }
    }

    /// Destroy every child of `key`, pending ones included
    ///
    /// Pending additions are dropped without callbacks, the list is resolved, then the
    /// first live child is destroyed until none remain.
    pub fn destroy_all_children(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        for dropped in node.children.drop_pending_adds() {
            if let Some(child) = self.nodes.get_mut(dropped) {
                if child.parent == Some(key) {
                    child.parent = None;
                    child.depth = -1;
                    child.pos = -1;
                }
            }
        }
        self.update_lists(key);
        self.destroy_children_now(key);
    }

    fn destroy_children_now(&mut self, key: NodeKey) {
        while let Some(child) = self.nodes.get_mut(key).and_then(|node| node.children.pop_front_now()) {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
            self.destroy(child);
        }
    }

    fn free(&mut self, key: NodeKey) {
        if self.nodes.get(key).is_some_and(Node::inside_tree) {
            self.exit_tree(key);
        }
        self.nodes.remove(key);
    }

    /// Resolve the pending additions and removals of `owner`'s children
    ///
    /// Purged nodes leave the scene (and are freed if destroyed); nodes that went live
    /// under an owner inside the tree enter the scene.
    pub fn update_lists(&mut self, owner: NodeKey) -> ListChanges {
        let changes = self
            .with_children(owner, |list, arena| list.update_lists(arena))
            .unwrap_or_default();

        for key in &changes.removed {
            let key = *key;
            if self.nodes.get(owner).is_some_and(|node| node.children.contains(key)) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(key) else {
                continue;
            };
            if node.parent == Some(owner) {
                node.parent = None;
                node.depth = -1;
                node.pos = -1;
            }
            if node.is_destroyed() {
                self.free(key);
            } else if node.inside_tree() && !self.parent_inside_tree(key) {
                self.exit_tree(key);
            }
        }

        let owner_inside = self.nodes.get(owner).is_some_and(Node::inside_tree);
        for key in &changes.added {
            if owner_inside && self.nodes.get(*key).is_some_and(|node| !node.inside_tree()) {
                self.enter_tree(*key);
            }
        }
        changes
    }

    /// Run the pre-update, update and post-update passes from the root
    pub fn update(&mut self, dt: Duration) {
        self.propagate(self.root, Pass::PreUpdate(dt));
        self.propagate(self.root, Pass::Update(dt));
        self.propagate(self.root, Pass::PostUpdate(dt));
    }

    /// Run the fixed-step pass from the root
    pub fn fixed_update(&mut self) {
        self.propagate(self.root, Pass::Fixed);
    }

    fn propagate(&mut self, key: NodeKey, pass: Pass) {
        self.call_behavior(key, |behavior, tree, key| match pass {
            Pass::PreUpdate(dt) => behavior.pre_update(tree, key, dt),
            Pass::Update(dt) => behavior.update(tree, key, dt),
            Pass::PostUpdate(dt) => behavior.post_update(tree, key, dt),
            Pass::Fixed => behavior.fixed_update(tree, key),
        });

        let updating = matches!(pass, Pass::Update(_));
        if updating {
            self.update_lists(key);
        }

        let Some(node) = self.nodes.get(key) else {
            return;
        };
        for child in node.children.update_targets(&self.nodes) {
            if self.nodes.get(child).is_some_and(|node| node.enabled() && !node.is_destroyed()) {
                self.propagate(child, pass);
            }
        }

        if updating {
            if let Some(node) = self.nodes.get_mut(key) {
                node.children.advance_frame();
            }
        }
    }

    /// Visit every enabled node below the root in render order, parents before children
    ///
    /// Disabled or destroyed nodes are skipped together with their subtrees.
    pub fn render(&self, mut visitor: impl FnMut(NodeKey, &Node)) {
        self.render_children(self.root, &mut visitor);
    }

    fn render_children(&self, key: NodeKey, visitor: &mut dyn FnMut(NodeKey, &Node)) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        node.children.for_each_sorted(|child| {
            if let Some(child_node) = self.nodes.get(child) {
                if child_node.enabled() && !child_node.is_destroyed() {
                    visitor(child, child_node);
                    self.render_children(child, visitor);
                }
            }
        });
    }

    /// First live node called `name`, depth first from the root
    pub fn find_node(&self, name: &str) -> Option<NodeKey> {
        self.find_node_below(self.root, name)
    }

    fn find_node_below(&self, key: NodeKey, name: &str) -> Option<NodeKey> {
        let node = self.nodes.get(key)?;
        for child in node.children.iter() {
            if self.nodes.get(child).is_some_and(|node| node.name() == name) {
                return Some(child);
            }
            if let Some(found) = self.find_node_below(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// First live node registering `kind`, depth first from the root
    pub fn find_first_node_of_type(&self, kind: NodeKind) -> Option<NodeKey> {
        self.nodes
            .get(self.root)?
            .children
            .find_first_node_of_type(kind, &self.nodes)
    }

    /// Render the live tree as indented ASCII
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        if let Some(root) = self.nodes.get(self.root) {
            out.push_str(root.name());
            out.push('\n');
            self.write_children(self.root, "", &mut out);
        }
        out
    }

    fn write_children(&self, key: NodeKey, prefix: &str, out: &mut String) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let count = node.children.len();
        for (index, child) in node.children.iter().enumerate() {
            let Some(child_node) = self.nodes.get(child) else {
                continue;
            };
            let last = index + 1 == count;
            let branch = if last { "└── " } else { "├── " };
            let _ = writeln!(out, "{prefix}{branch}{}", child_node.name());
            let next = format!("{prefix}{}", if last { "    " } else { "│   " });
            self.write_children(child, &next, out);
        }
    }

    fn is_ancestor(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        let mut current = self.nodes.get(key).and_then(Node::parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.nodes.get(parent).and_then(Node::parent);
        }
        false
    }

    fn parent_inside_tree(&self, key: NodeKey) -> bool {
        self.nodes
            .get(key)
            .and_then(Node::parent)
            .and_then(|parent| self.nodes.get(parent))
            .is_some_and(Node::inside_tree)
    }

    fn set_depth(&mut self, key: NodeKey, depth: i32) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.depth = depth;
        let children: Vec<_> = node.children.iter_all().collect();
        for child in children {
            self.set_depth(child, depth + 1);
        }
    }

    fn renumber(&mut self, owner: NodeKey) {
        self.with_children(owner, |list, arena| list.renumber(arena));
    }

    fn with_children<R>(
        &mut self,
        owner: NodeKey,
        action: impl FnOnce(&mut NodeList, &mut NodeArena<Node>) -> R,
    ) -> Option<R> {
        let mut list = std::mem::take(&mut self.nodes.get_mut(owner)?.children);
        let result = action(&mut list, &mut self.nodes);
        if let Some(node) = self.nodes.get_mut(owner) {
            node.children = list;
        }
        Some(result)
    }

    fn enter_tree(&mut self, key: NodeKey) {
        self.announce_added(key);
        self.fire_ready(key);
    }

    fn announce_added(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        node.flags.insert(NodeFlags::IN_TREE);
        self.fire(key, Lifecycle::AddedToScene);

        let children: Vec<_> = self.nodes.get(key).map(|node| node.children.iter().collect()).unwrap_or_default();
        for child in children {
            self.announce_added(child);
        }
    }

    fn fire_ready(&mut self, key: NodeKey) {
        let children: Vec<_> = self.nodes.get(key).map(|node| node.children.iter().collect()).unwrap_or_default();
        for child in children {
            self.fire_ready(child);
        }
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if node.inside_tree() && !node.flags.contains(NodeFlags::READY) {
            node.flags.insert(NodeFlags::READY);
            self.fire(key, Lifecycle::Ready);
        }
    }

    fn exit_tree(&mut self, key: NodeKey) {
        let children: Vec<_> = self.nodes.get(key).map(|node| node.children.iter().collect()).unwrap_or_default();
        for child in children {
            self.exit_tree(child);
        }
        let Some(node) = self.nodes.get_mut(key) else {
            return;
        };
        if node.inside_tree() {
            node.flags.remove(NodeFlags::IN_TREE);
            self.fire(key, Lifecycle::RemovedFromScene);
        }
    }

    /// Run a lifecycle hook now, or after the node's running hook if it has one
    fn fire(&mut self, key: NodeKey, hook: Lifecycle) {
        if self.busy.contains(&key) {
            self.deferred.push((key, hook));
        } else {
            self.call_behavior(key, |behavior, tree, key| hook.dispatch(behavior, tree, key));
        }
    }

    /// Check the behaviour out, run `hook`, then drain hooks deferred meanwhile
    ///
    /// Deferred hooks run on the checked-out behaviour even when the node was freed
    /// by the hook.
    fn call_behavior(&mut self, key: NodeKey, hook: impl FnOnce(&mut dyn NodeBehavior, &mut Self, NodeKey)) {
        let Some(mut behavior) = self.nodes.get_mut(key).and_then(|node| node.behavior.take()) else {
            return;
        };
        self.busy.push(key);
        hook(behavior.as_mut(), self, key);
        while let Some(index) = self.deferred.iter().position(|(deferred, _)| *deferred == key) {
            let (_, pending) = self.deferred.remove(index);
            pending.dispatch(behavior.as_mut(), self, key);
        }
        if let Some(index) = self.busy.iter().rposition(|busy| *busy == key) {
            self.busy.remove(index);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            if node.behavior.is_none() {
                node.behavior = Some(behavior);
            }
        }
    }
}

impl Default for SceneTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        journal: Journal,
    }

    impl Recorder {
        fn log(&self, event: &str) {
            self.journal.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl NodeBehavior for Recorder {
        fn ready(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.log("ready");
        }
        fn on_added_to_scene(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.log("added");
        }
        fn on_removed_from_scene(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.log("removed");
        }
        fn update(&mut self, _: &mut SceneTree, _: NodeKey, _: Duration) {
            self.log("update");
        }
        fn on_destroy(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.log("destroy");
        }
        fn on_enabled(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.log("enabled");
        }
        fn on_disabled(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.log("disabled");
        }
    }

    fn recorder(tree: &mut SceneTree, name: &'static str, journal: &Journal) -> NodeKey {
        tree.create_node_with(
            name,
            Recorder {
                name,
                journal: Rc::clone(journal),
            },
        )
    }

    fn drain(journal: &Journal) -> Vec<String> {
        journal.borrow_mut().drain(..).collect()
    }

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn test_scene_tree_creation() {
        let tree = SceneTree::new();
        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.depth(), 0);
        assert!(root.inside_tree());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_child_goes_live_on_next_update() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let child = tree.create_node("child");
        assert!(tree.add_child(root, child));

        assert_eq!(tree.get(child).unwrap().parent(), Some(root));
        assert_eq!(tree.get(child).unwrap().depth(), 1);
        assert!(!tree.get(root).unwrap().children().contains(child));
        assert!(!tree.get(child).unwrap().inside_tree());

        tree.update(FRAME);
        assert!(tree.get(root).unwrap().children().contains(child));
        assert!(tree.get(child).unwrap().inside_tree());
        assert_eq!(tree.get(child).unwrap().pos(), 1);
    }

    #[test]
    fn test_enter_tree_callbacks_order() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let parent = recorder(&mut tree, "parent", &journal);
        let child = recorder(&mut tree, "child", &journal);
        tree.add_child(parent, child);
        tree.update_lists(parent);
        assert!(drain(&journal).is_empty());

        let root = tree.root();
        tree.add_child(root, parent);
        tree.update_lists(root);
        assert_eq!(
            drain(&journal),
            vec!["parent:added", "child:added", "child:ready", "parent:ready"]
        );

        tree.remove_child(root, parent);
        tree.update_lists(root);
        tree.add_child(root, parent);
        tree.update_lists(root);
        assert_eq!(
            drain(&journal),
            vec!["child:removed", "parent:removed", "parent:added", "child:added"]
        );
    }

    #[test]
    fn test_update_runs_behaviour_each_frame() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = recorder(&mut tree, "node", &journal);
        tree.add_child(root, node);

        tree.update(FRAME);
        tree.update(FRAME);
        let updates = drain(&journal).iter().filter(|event| event.ends_with("update")).count();
        assert_eq!(updates, 2);
    }

    #[test]
    fn test_update_interval_skips_frames() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = tree.insert_node(
            Node::new("slow")
                .with_update_interval(2)
                .with_behavior(Recorder {
                    name: "slow",
                    journal: Rc::clone(&journal),
                }),
        );
        tree.add_child(root, node);

        for _ in 0..4 {
            tree.update(FRAME);
        }
        let updates = drain(&journal).iter().filter(|event| event.ends_with("update")).count();
        assert_eq!(updates, 2);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = recorder(&mut tree, "node", &journal);
        tree.add_child(root, node);
        tree.update(FRAME);
        drain(&journal);

        tree.destroy(node);
        tree.destroy(node);
        assert!(tree.get(node).unwrap().is_destroyed());
        assert!(!tree.get(node).unwrap().enabled());
        assert_eq!(drain(&journal), vec!["node:destroy"]);

        tree.update(FRAME);
        assert!(!tree.contains(node));
        assert_eq!(drain(&journal), vec!["node:removed"]);

        tree.destroy(node);
        assert!(drain(&journal).is_empty());
    }

    #[test]
    fn test_destroy_children_before_parent() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let parent = recorder(&mut tree, "parent", &journal);
        let first = recorder(&mut tree, "first", &journal);
        let second = recorder(&mut tree, "second", &journal);
        tree.add_child(root, parent);
        tree.add_child(parent, first);
        tree.update(FRAME);
        tree.add_child(parent, second);
        drain(&journal);

        tree.destroy(parent);
        assert_eq!(
            drain(&journal),
            vec!["first:destroy", "first:removed", "second:destroy", "parent:destroy"]
        );
        assert!(!tree.contains(first));
        assert!(!tree.contains(second));
        assert!(tree.contains(parent));

        tree.update(FRAME);
        assert!(!tree.contains(parent));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_destroy_pending_node_frees_at_once() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = tree.create_node("node");
        tree.add_child(root, node);
        tree.destroy(node);
        assert!(!tree.contains(node));
        assert_eq!(tree.get(root).unwrap().children().pending_add_len(), 0);
    }

    #[test]
    fn test_destroy_all_children() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let live = recorder(&mut tree, "live", &journal);
        let pending = recorder(&mut tree, "pending", &journal);
        tree.add_child(root, live);
        tree.update(FRAME);
        tree.add_child(root, pending);
        drain(&journal);

        tree.destroy_all_children(root);
        assert_eq!(drain(&journal), vec!["live:destroy", "live:removed"]);
        assert!(tree.get(root).unwrap().children().is_empty());
        assert!(!tree.contains(live));
        assert!(tree.contains(pending));
        assert_eq!(tree.get(pending).unwrap().parent(), None);
    }

    struct Destroyer {
        name: &'static str,
        target: Option<NodeKey>,
        journal: Journal,
    }

    impl NodeBehavior for Destroyer {
        fn update(&mut self, tree: &mut SceneTree, key: NodeKey, _: Duration) {
            tree.destroy(self.target.unwrap_or(key));
        }
        fn on_destroy(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.journal.borrow_mut().push(format!("{}:destroy", self.name));
        }
        fn on_removed_from_scene(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.journal.borrow_mut().push(format!("{}:removed", self.name));
        }
        fn on_disabled(&mut self, _: &mut SceneTree, _: NodeKey) {
            self.journal.borrow_mut().push(format!("{}:disabled", self.name));
        }
    }

    #[test]
    fn test_self_destroy_in_update_fires_on_destroy() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = tree.create_node_with(
            "node",
            Destroyer {
                name: "node",
                target: None,
                journal: Rc::clone(&journal),
            },
        );
        tree.add_child(root, node);

        tree.update(FRAME);
        assert_eq!(drain(&journal), vec!["node:destroy"]);
        assert!(tree.get(node).unwrap().is_destroyed());
        assert!(tree.get(node).unwrap().has_behavior());

        tree.update(FRAME);
        assert_eq!(drain(&journal), vec!["node:removed"]);
        assert!(!tree.contains(node));
    }

    #[test]
    fn test_child_destroying_its_parent_still_gets_its_hooks() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let parent = recorder(&mut tree, "parent", &journal);
        let child = tree.create_node_with(
            "child",
            Destroyer {
                name: "child",
                target: Some(parent),
                journal: Rc::clone(&journal),
            },
        );
        tree.add_child(root, parent);
        tree.add_child(parent, child);

        tree.update(FRAME);
        assert_eq!(
            drain(&journal),
            vec![
                "parent:added",
                "parent:ready",
                "parent:update",
                "parent:destroy",
                "child:destroy",
                "child:removed"
            ]
        );
        assert!(!tree.contains(child));
        assert!(tree.get(parent).unwrap().is_destroyed());
    }

    #[test]
    fn test_self_disable_in_update_fires_on_disabled() {
        struct Sleeper {
            journal: Journal,
        }
        impl NodeBehavior for Sleeper {
            fn update(&mut self, tree: &mut SceneTree, key: NodeKey, _: Duration) {
                tree.set_enabled(key, false);
            }
            fn on_disabled(&mut self, _: &mut SceneTree, _: NodeKey) {
                self.journal.borrow_mut().push("sleeper:disabled".to_string());
            }
        }

        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = tree.create_node_with("sleeper", Sleeper { journal: Rc::clone(&journal) });
        tree.add_child(root, node);

        tree.update(FRAME);
        assert_eq!(drain(&journal), vec!["sleeper:disabled"]);
        assert!(!tree.get(node).unwrap().enabled());
    }

    #[test]
    fn test_destroy_from_inside_update() {
        struct SelfDestruct;
        impl NodeBehavior for SelfDestruct {
            fn update(&mut self, tree: &mut SceneTree, key: NodeKey, _: Duration) {
                let sibling = tree.find_node("victim");
                if let Some(sibling) = sibling {
                    tree.destroy(sibling);
                }
                let spawned = tree.create_node("spawned");
                let parent = tree.get(key).and_then(Node::parent).unwrap();
                tree.add_child(parent, spawned);
            }
        }

        let mut tree = SceneTree::new();
        let root = tree.root();
        let killer = tree.create_node_with("killer", SelfDestruct);
        let victim = tree.create_node("victim");
        tree.add_child(root, killer);
        tree.add_child(root, victim);
        tree.update(FRAME);

        assert!(tree.get(victim).unwrap().is_destroyed());
        assert!(tree.find_node("spawned").is_none());

        tree.update(FRAME);
        assert!(!tree.contains(victim));
        assert!(tree.find_node("spawned").is_some());
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        let leaf = tree.create_node("leaf");
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(a, leaf);
        tree.update(FRAME);
        assert_eq!(tree.get(leaf).unwrap().depth(), 2);

        assert!(tree.add_child(b, leaf));
        tree.update(FRAME);
        assert!(!tree.get(a).unwrap().children().contains(leaf));
        assert!(tree.get(b).unwrap().children().contains(leaf));
        assert_eq!(tree.get(leaf).unwrap().parent(), Some(b));
        assert!(tree.get(leaf).unwrap().inside_tree());
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        tree.add_child(root, a);
        tree.add_child(a, b);
        assert!(!tree.add_child(b, a));
        assert!(!tree.add_child(a, a));
        assert!(!tree.add_child(b, root));
    }

    #[test]
    fn test_set_enabled_cascades() {
        let journal = Journal::default();
        let mut tree = SceneTree::new();
        let root = tree.root();
        let parent = recorder(&mut tree, "parent", &journal);
        let child = recorder(&mut tree, "child", &journal);
        tree.add_child(root, parent);
        tree.add_child(parent, child);
        tree.update(FRAME);
        drain(&journal);

        tree.set_enabled(parent, false);
        assert_eq!(drain(&journal), vec!["child:disabled", "parent:disabled"]);
        tree.update(FRAME);
        assert!(drain(&journal).is_empty());

        tree.set_enabled(parent, false);
        assert!(drain(&journal).is_empty());
        tree.set_enabled(parent, true);
        assert_eq!(drain(&journal), vec!["child:enabled", "parent:enabled"]);
    }

    #[test]
    fn test_find_first_node_of_type_searches_depth_first() {
        let sprite = NodeKind("Sprite");
        let mut tree = SceneTree::new();
        let root = tree.root();
        let group = tree.create_node("group");
        let nested = tree.insert_node(Node::new("nested").with_kind(sprite));
        let later = tree.insert_node(Node::new("later").with_kind(sprite));
        tree.add_child(root, group);
        tree.add_child(root, later);
        tree.add_child(group, nested);
        tree.update(FRAME);

        assert_eq!(tree.find_first_node_of_type(sprite), Some(nested));
        assert_eq!(tree.find_first_node_of_type(NodeKind("Camera")), None);
        assert_eq!(tree.find_node("nested"), Some(nested));
    }

    #[test]
    fn test_render_follows_sort_and_skips_disabled() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let b = tree.create_node("b");
        let a = tree.create_node("a");
        let hidden = tree.create_node("hidden");
        let inner = tree.create_node("inner");
        tree.add_child(root, b);
        tree.add_child(root, a);
        tree.add_child(root, hidden);
        tree.add_child(a, inner);
        tree.set_child_sort(root, Some(Box::new(|x: &Node, y: &Node| x.name().cmp(y.name()))));
        tree.update(FRAME);
        tree.set_enabled(hidden, false);

        let mut order = Vec::new();
        tree.render(|_, node| order.push(node.name().to_string()));
        assert_eq!(order, vec!["a", "inner", "b"]);
    }

    #[test]
    fn test_tags_follow_set_tag() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let node = tree.create_node("enemy");
        tree.add_child(root, node);
        tree.update(FRAME);

        tree.set_tag(node, 3);
        let children = tree.get(root).unwrap().children();
        assert_eq!(children.nodes_with_tag(3), &[node]);
        assert!(children.nodes_with_tag(0).is_empty());
    }

    #[test]
    fn test_child_ordering_helpers() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        let c = tree.create_node("c");
        for key in [a, b, c] {
            tree.add_child(root, key);
        }
        tree.update(FRAME);

        assert!(tree.send_child_to_top(root, c));
        assert!(tree.swap_children(root, a, b));
        assert!(tree.move_child(root, c, 2));
        assert!(tree.send_child_to_bottom(root, b));
        tree.update(FRAME);
        let order: Vec<_> = tree.get(root).unwrap().children().iter().collect();
        assert_eq!(order, vec![a, c, b]);
        assert_eq!(tree.get(b).unwrap().pos(), 3);
    }

    #[test]
    fn test_tree_string() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        let c = tree.create_node("c");
        tree.add_child(root, a);
        tree.add_child(root, b);
        tree.add_child(a, c);
        tree.update(FRAME);

        assert_eq!(tree.tree_string(), "root\n├── a\n│   └── c\n└── b\n");
    }
}
