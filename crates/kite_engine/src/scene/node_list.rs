//! Deferred-mutation child list
//!
//! A [`NodeList`] never changes its live order while a traversal may be walking it.
//! `add` and `remove` only queue work; [`NodeList::update_lists`] applies the queues
//! once per frame, removals first, then re-sorts. Nodes themselves live in the tree's
//! arena and are referenced here by [`NodeKey`].

use super::node::{Node, NodeKind};
use crate::foundation::collections::{NodeArena, NodeKey};
use crate::foundation::logging::warn;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Render-order comparator installed with [`NodeList::set_sort`]
pub type NodeComparator = Box<dyn Fn(&Node, &Node) -> Ordering>;

/// Keys that left and joined the live list during one [`NodeList::update_lists`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListChanges {
    /// Keys purged from the live list, in queue order
    pub removed: Vec<NodeKey>,
    /// Keys that went live, in queue order
    pub added: Vec<NodeKey>,
}

impl ListChanges {
    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Outcome of [`NodeList::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The node was only pending and has been dropped from the queue
    Dropped,
    /// The node is live and will be purged on the next update
    Queued,
    /// The node was not in the list or was already queued for removal
    Ignored,
}

/// Child list of a node
#[derive(Default)]
pub struct NodeList {
    nodes: Vec<NodeKey>,
    sorted_nodes: Vec<NodeKey>,
    pending_add: Vec<(NodeKey, Option<usize>)>,
    pending_remove: Vec<NodeKey>,
    tag_index: BTreeMap<i32, Vec<NodeKey>>,
    sort: Option<NodeComparator>,
    unsorted: bool,
    frame_count: u64,
}

impl NodeList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a node to go live at the end of the list
    ///
    /// Adding a node that is already live or already queued logs a warning and does
    /// nothing. A live node that is queued for removal may be queued again; it stays
    /// live after the next update.
    pub fn add(&mut self, key: NodeKey) -> bool {
        self.queue_add(key, None)
    }

    /// Queue a node to go live at `index` in the live order
    pub fn add_at(&mut self, key: NodeKey, index: usize) -> bool {
        self.queue_add(key, Some(index))
    }

    fn queue_add(&mut self, key: NodeKey, index: Option<usize>) -> bool {
        let live = self.nodes.contains(&key) && !self.pending_remove.contains(&key);
        if live || self.is_pending_add(key) {
            warn!("You are trying to add a node ({key:?}) that you already added.");
            return false;
        }
        self.pending_add.push((key, index));
        true
    }

    /// Queue a live node for removal
    ///
    /// A node that never went live is dropped from the add queue straight away.
    pub fn remove(&mut self, key: NodeKey) -> Removal {
        if let Some(index) = self.pending_add.iter().position(|(pending, _)| *pending == key) {
            self.pending_add.remove(index);
            return Removal::Dropped;
        }
        if self.pending_remove.contains(&key) || !self.nodes.contains(&key) {
            warn!("You are trying to remove a node ({key:?}) that you already removed.");
            return Removal::Ignored;
        }
        self.pending_remove.push(key);
        Removal::Queued
    }

    /// Apply queued removals, then queued additions, then re-sort
    ///
    /// Keys missing from `arena` are skipped. Sibling positions of every node in the
    /// list are renumbered from the resulting order.
    pub fn update_lists(&mut self, arena: &mut NodeArena<Node>) -> ListChanges {
        let mut changes = ListChanges::default();
        let mut touched_tags = BTreeSet::new();

        for key in std::mem::take(&mut self.pending_remove) {
            self.nodes.retain(|live| *live != key);
            self.sorted_nodes.retain(|live| *live != key);
            self.unindex_tag(key, &mut touched_tags);
            changes.removed.push(key);
        }

        for (key, index) in std::mem::take(&mut self.pending_add) {
            let Some(node) = arena.get(key) else {
                continue;
            };
            match index {
                Some(index) => self.nodes.insert(index.min(self.nodes.len()), key),
                None => self.nodes.push(key),
            }
            if self.sort.is_some() {
                self.sorted_nodes.push(key);
            }
            self.tag_index.entry(node.tag).or_default().push(key);
            touched_tags.insert(node.tag);
            changes.added.push(key);
            self.unsorted = true;
        }

        if !changes.removed.is_empty() || self.unsorted || self.sort.is_some() {
            self.renumber(arena);
        }

        if self.unsorted || self.sort.is_some() {
            self.nodes.sort_by(|a, b| natural_order(arena, *a, *b));
            if let Some(compare) = &self.sort {
                self.sorted_nodes.sort_by(|a, b| match (arena.get(*a), arena.get(*b)) {
                    (Some(a), Some(b)) => compare(a, b),
                    _ => Ordering::Equal,
                });
            }
            self.unsorted = false;
        }

        for tag in touched_tags {
            if let Some(bucket) = self.tag_index.get_mut(&tag) {
                bucket.sort_by(|a, b| natural_order(arena, *a, *b));
                if bucket.is_empty() {
                    self.tag_index.remove(&tag);
                }
            }
        }

        changes
    }

    /// Install or clear the render-order comparator
    ///
    /// Update order keeps following the natural order; [`NodeList::sorted`] and
    /// [`NodeList::for_each_sorted`] follow the comparator from the next update on.
    pub fn set_sort(&mut self, sort: Option<NodeComparator>) {
        self.sort = sort;
        self.unsorted = true;
        self.sorted_nodes.clear();
        if self.sort.is_some() {
            self.sorted_nodes.extend_from_slice(&self.nodes);
        }
    }

    /// Whether a render-order comparator is installed
    pub fn has_custom_sort(&self) -> bool {
        self.sort.is_some()
    }

    /// Whether `node` should receive update calls this frame
    pub fn can_update(&self, node: &Node) -> bool {
        let interval = u64::from(node.update_interval());
        node.enabled()
            && !node.is_destroyed()
            && interval > 0
            && (interval == 1 || self.frame_count % interval == 0)
    }

    /// Live nodes that should receive update calls this frame, in live order
    pub fn update_targets(&self, arena: &NodeArena<Node>) -> Vec<NodeKey> {
        self.nodes
            .iter()
            .copied()
            .filter(|key| arena.get(*key).is_some_and(|node| self.can_update(node)))
            .collect()
    }

    /// Count one finished update pass
    pub fn advance_frame(&mut self) {
        self.frame_count += 1;
    }

    /// Update passes run over this list so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Live nodes in render order
    pub fn sorted(&self) -> &[NodeKey] {
        if self.sort.is_some() {
            &self.sorted_nodes
        } else {
            &self.nodes
        }
    }

    /// Visit live nodes in render order
    pub fn for_each_sorted(&self, mut action: impl FnMut(NodeKey)) {
        for key in self.sorted() {
            action(*key);
        }
    }

    /// First live node called `name`
    pub fn find_node(&self, name: &str, arena: &NodeArena<Node>) -> Option<NodeKey> {
        self.nodes
            .iter()
            .copied()
            .find(|key| arena.get(*key).is_some_and(|node| node.name() == name))
    }

    /// First live node of `kind`, searching each node's own subtree before its next sibling
    pub fn find_first_node_of_type(&self, kind: NodeKind, arena: &NodeArena<Node>) -> Option<NodeKey> {
        for key in &self.nodes {
            let Some(node) = arena.get(*key) else {
                continue;
            };
            if node.is_kind(kind) {
                return Some(*key);
            }
            if let Some(found) = node.children().find_first_node_of_type(kind, arena) {
                return Some(found);
            }
        }
        None
    }

    /// Live nodes of `kind`, not recursing into children
    pub fn nodes_of_type(&self, kind: NodeKind, arena: &NodeArena<Node>) -> Vec<NodeKey> {
        self.nodes
            .iter()
            .copied()
            .filter(|key| arena.get(*key).is_some_and(|node| node.is_kind(kind)))
            .collect()
    }

    /// Live nodes carrying `tag`, in natural order
    pub fn nodes_with_tag(&self, tag: i32) -> &[NodeKey] {
        self.tag_index.get(&tag).map_or(&[], Vec::as_slice)
    }

    /// Whether `key` is live in this list
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains(&key)
    }

    /// Whether `key` is waiting to go live
    pub fn is_pending_add(&self, key: NodeKey) -> bool {
        self.pending_add.iter().any(|(pending, _)| *pending == key)
    }

    /// Whether `key` is waiting to be purged
    pub fn is_pending_remove(&self, key: NodeKey) -> bool {
        self.pending_remove.contains(&key)
    }

    /// Live node at `index`
    pub fn get(&self, index: usize) -> Option<NodeKey> {
        self.nodes.get(index).copied()
    }

    /// Position of a live node
    pub fn index_of(&self, key: NodeKey) -> Option<usize> {
        self.nodes.iter().position(|live| *live == key)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether there are no live nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes waiting to go live
    pub fn pending_add_len(&self) -> usize {
        self.pending_add.len()
    }

    /// Number of nodes waiting to be purged
    pub fn pending_remove_len(&self) -> usize {
        self.pending_remove.len()
    }

    /// Live nodes in live order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = NodeKey> + '_ {
        self.nodes.iter().copied()
    }

    /// Live nodes in reverse live order
    pub fn iter_rev(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes.iter().rev().copied()
    }

    /// Live nodes followed by nodes waiting to go live
    pub fn iter_all(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.nodes
            .iter()
            .copied()
            .chain(self.pending_add.iter().map(|(key, _)| *key))
    }

    /// Move a live node to the front
    pub fn send_to_top(&mut self, key: NodeKey) -> bool {
        self.move_to(key, 0)
    }

    /// Move a live node to the back
    pub fn send_to_bottom(&mut self, key: NodeKey) -> bool {
        let last = self.nodes.len().saturating_sub(1);
        self.move_to(key, last)
    }

    /// Swap two live nodes
    pub fn swap(&mut self, a: NodeKey, b: NodeKey) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(first), Some(second)) => {
                self.nodes.swap(first, second);
                self.unsorted = true;
                true
            }
            _ => false,
        }
    }

    /// Move a live node to `index`
    pub fn move_to(&mut self, key: NodeKey, index: usize) -> bool {
        let Some(current) = self.index_of(key) else {
            return false;
        };
        self.nodes.remove(current);
        self.nodes.insert(index.min(self.nodes.len()), key);
        self.unsorted = true;
        true
    }

    /// Give every node its 1-based sibling position; queued nodes follow the live ones
    pub(crate) fn renumber(&self, arena: &mut NodeArena<Node>) {
        for (pos, key) in self.iter_all().enumerate() {
            if let Some(node) = arena.get_mut(key) {
                node.pos = i32::try_from(pos + 1).unwrap_or(i32::MAX);
            }
        }
    }

    /// Move a live node between tag buckets
    pub(crate) fn retag(&mut self, key: NodeKey, old: i32, new: i32, arena: &NodeArena<Node>) {
        if !self.nodes.contains(&key) || old == new {
            return;
        }
        if let Some(bucket) = self.tag_index.get_mut(&old) {
            bucket.retain(|tagged| *tagged != key);
            if bucket.is_empty() {
                self.tag_index.remove(&old);
            }
        }
        let bucket = self.tag_index.entry(new).or_default();
        bucket.push(key);
        bucket.sort_by(|a, b| natural_order(arena, *a, *b));
    }

    /// Forget every queued addition, returning the dropped keys
    pub(crate) fn drop_pending_adds(&mut self) -> Vec<NodeKey> {
        self.pending_add.drain(..).map(|(key, _)| key).collect()
    }

    /// Take the first node out immediately, live nodes before queued ones
    ///
    /// Used when the owner is torn down and no traversal can observe the list.
    pub(crate) fn pop_front_now(&mut self) -> Option<NodeKey> {
        if let Some(&key) = self.nodes.first() {
            self.nodes.remove(0);
            self.sorted_nodes.retain(|live| *live != key);
            self.pending_remove.retain(|queued| *queued != key);
            self.unindex_tag(key, &mut BTreeSet::new());
            return Some(key);
        }
        if self.pending_add.is_empty() {
            return None;
        }
        Some(self.pending_add.remove(0).0)
    }

    fn unindex_tag(&mut self, key: NodeKey, touched: &mut BTreeSet<i32>) {
        let mut emptied = Vec::new();
        for (tag, bucket) in &mut self.tag_index {
            let before = bucket.len();
            bucket.retain(|tagged| *tagged != key);
            if bucket.len() != before {
                touched.insert(*tag);
                if bucket.is_empty() {
                    emptied.push(*tag);
                }
            }
        }
        for tag in emptied {
            self.tag_index.remove(&tag);
        }
    }
}

fn natural_order(arena: &NodeArena<Node>, a: NodeKey, b: NodeKey) -> Ordering {
    match (arena.get(a), arena.get(b)) {
        (Some(a), Some(b)) => a.natural_cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl fmt::Debug for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeList")
            .field("nodes", &self.nodes)
            .field("pending_add", &self.pending_add)
            .field("pending_remove", &self.pending_remove)
            .field("custom_sort", &self.sort.is_some())
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}
