//! Specialized collection types

pub use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle to a node owned by a [`SceneTree`](crate::scene::SceneTree)
    pub struct NodeKey;
}

/// Arena of values addressed by [`NodeKey`]
pub type NodeArena<T> = SlotMap<NodeKey, T>;
