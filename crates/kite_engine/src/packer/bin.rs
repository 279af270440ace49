//! Common interface for packing bins

use super::options::PackingOptions;
use super::rect::{BinRect, DataMap};
use std::fmt;

/// A single atlas page that rects are packed into
///
/// Implemented by [`MaxRectsBin`](super::MaxRectsBin) for regular pages and by
/// [`OversizedElementBin`](super::OversizedElementBin) for the one-rect pages that hold
/// anything bigger than the page limit.
pub trait Bin: fmt::Debug {
    /// Current page width
    fn width(&self) -> i32;

    /// Current page height
    fn height(&self) -> i32;

    /// Width limit for this page
    fn max_width(&self) -> i32 {
        self.options().max_width
    }

    /// Height limit for this page
    fn max_height(&self) -> i32 {
        self.options().max_height
    }

    /// Free space still available for placement
    fn free_rects(&self) -> &[BinRect];

    /// Placed rects in insertion order
    fn rects(&self) -> &[BinRect];

    /// Placed rects, mutable
    ///
    /// Editing a rect through this slice marks it dirty, which makes the next
    /// repack move it.
    fn rects_mut(&mut self) -> &mut [BinRect];

    /// Options this page was created with
    fn options(&self) -> &PackingOptions;

    /// Opaque page payload
    fn data(&self) -> &DataMap;

    /// Opaque page payload, mutable
    fn data_mut(&mut self) -> &mut DataMap;

    /// The page's own mutation counter, excluding its rects
    fn dirty_count(&self) -> u32;

    /// Whether the page or any of its rects changed since it was marked clean
    fn dirty(&self) -> bool {
        self.dirty_count() > 0 || self.rects().iter().any(BinRect::dirty)
    }

    /// `true` bumps the page counter, `false` marks the page and all its rects clean
    fn set_dirty(&mut self, value: bool);

    /// Place a rect, handing it back if it does not fit
    fn add(&mut self, rect: BinRect) -> Result<&BinRect, BinRect>;

    /// Drop every placed rect; `deep` also forgets the page size and payload
    fn reset(&mut self, deep: bool);

    /// Re-place dirty rects, returning those that no longer fit
    fn repack(&mut self) -> Vec<BinRect>;

    /// Whether this page holds a single rect bigger than the page limit
    fn is_oversized(&self) -> bool;

    /// Fresh page with the same options and every rect placed again
    fn clone_bin(&self) -> Box<dyn Bin>;
}

/// Round up to the next power of two (values below one stay as they are)
pub(crate) fn next_power_of_two(value: i32) -> i32 {
    if value <= 1 {
        return value;
    }
    u32::try_from(value)
        .ok()
        .and_then(|v| v.checked_next_power_of_two())
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(i32::MAX)
}
