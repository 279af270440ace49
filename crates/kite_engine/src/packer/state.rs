//! Persisted packing state
//!
//! [`SavedBin`] is the plain form produced by [`MaxRectsPacker::save`] and consumed by
//! [`MaxRectsPacker::load`]. The helpers here read and write a list of them as RON so an
//! atlas can be extended later without packing everything again.
//!
//! [`MaxRectsPacker::save`]: super::MaxRectsPacker::save
//! [`MaxRectsPacker::load`]: super::MaxRectsPacker::load

use super::bin::Bin;
use super::options::PackingOptions;
use super::rect::{BinRect, DataMap};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One page as written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedBin {
    /// Page width
    pub width: i32,
    /// Page height
    pub height: i32,
    /// Page width limit
    pub max_width: i32,
    /// Page height limit
    pub max_height: i32,
    /// Remaining free space
    #[serde(default)]
    pub free_rects: Vec<BinRect>,
    /// Placed rects
    pub rects: Vec<BinRect>,
    /// Options the page was packed with
    #[serde(default)]
    pub options: PackingOptions,
    /// Opaque page payload
    #[serde(default)]
    pub data: DataMap,
    /// Whether the page is a single oversized rect
    #[serde(default)]
    pub oversized: bool,
}

impl SavedBin {
    /// Snapshot a live page
    pub fn from_bin(bin: &dyn Bin) -> Self {
        Self {
            width: bin.width(),
            height: bin.height(),
            max_width: bin.max_width(),
            max_height: bin.max_height(),
            free_rects: bin.free_rects().to_vec(),
            rects: bin.rects().to_vec(),
            options: bin.options().clone(),
            data: bin.data().clone(),
            oversized: bin.is_oversized(),
        }
    }
}

/// Errors from reading or writing packing state
#[derive(thiserror::Error, Debug)]
pub enum PackerStateError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Render saved pages as pretty RON
pub fn to_ron_string(bins: &[SavedBin]) -> Result<String, PackerStateError> {
    ron::ser::to_string_pretty(bins, ron::ser::PrettyConfig::default())
        .map_err(|e| PackerStateError::Serialize(e.to_string()))
}

/// Parse saved pages from RON
pub fn from_ron_str(contents: &str) -> Result<Vec<SavedBin>, PackerStateError> {
    ron::from_str(contents).map_err(|e| PackerStateError::Parse(e.to_string()))
}

/// Write saved pages to a RON file
pub fn save_to_file(path: impl AsRef<Path>, bins: &[SavedBin]) -> Result<(), PackerStateError> {
    let contents = to_ron_string(bins)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Read saved pages from a RON file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<SavedBin>, PackerStateError> {
    let contents = std::fs::read_to_string(path)?;
    from_ron_str(&contents)
}
