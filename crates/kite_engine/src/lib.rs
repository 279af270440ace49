//! # Kite Engine
//!
//! Engine-side building blocks for 2D games: texture atlas packing, polygon
//! triangulation and a frame-driven scene tree.
//!
//! ## Features
//!
//! - **Atlas Packing**: MAXRECTS pages with rotation, padding, oversized items and repacking
//! - **Packing State**: Save and restore packer pages as RON
//! - **Triangulation**: Ear clipping of simple polygons in either winding
//! - **Scene Tree**: Deferred child lists, lifecycle hooks and per-frame passes
//!
//! ## Quick Start
//!
//! ```rust
//! use kite_engine::prelude::*;
//!
//! let mut packer = MaxRectsPacker::new(PackingOptions::default());
//! packer.add(BinRect::new(200, 100).with_tag("hero"));
//! assert_eq!(packer.bins().len(), 1);
//!
//! let mut tree = SceneTree::new();
//! let root = tree.root();
//! let hero = tree.create_node("hero");
//! tree.add_child(root, hero);
//! tree.update(std::time::Duration::from_millis(16));
//! assert_eq!(tree.find_node("hero"), Some(hero));
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod foundation;
pub mod geometry;
pub mod packer;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ConfigFormat},
        foundation::{
            collections::NodeKey,
            logging,
            math::{Point2, Vec2},
        },
        geometry::Triangulator,
        packer::{Bin, BinRect, DataMap, DataValue, MaxRectsBin, MaxRectsPacker, PackingOptions, SavedBin},
        scene::{Node, NodeBehavior, NodeKind, SceneTree},
    };
}

#[cfg(test)]
mod tests;
