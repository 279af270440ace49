//! Rectangle bin packing for texture atlases
//!
//! This module provides the page packers used by the atlas tool:
//! - [`BinRect`] packable rects with dirty tracking
//! - [`MaxRectsBin`] single-page MAXRECTS packer
//! - [`OversizedElementBin`] one-rect pages for items above the page limit
//! - [`MaxRectsPacker`] multi-page orchestration with save/load
//! - [`PackingOptions`] page limits, padding and rotation policy

pub mod bin;
pub mod max_rects_bin;
pub mod max_rects_packer;
pub mod options;
pub mod oversized;
pub mod rect;
pub mod state;

pub use bin::Bin;
pub use max_rects_bin::MaxRectsBin;
pub use max_rects_packer::MaxRectsPacker;
pub use options::PackingOptions;
pub use oversized::OversizedElementBin;
pub use rect::{BinRect, DataMap, DataValue};
pub use state::{PackerStateError, SavedBin};
