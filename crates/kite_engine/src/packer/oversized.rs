//! Single-rect page for items bigger than the page limit

use super::bin::Bin;
use super::options::PackingOptions;
use super::rect::{BinRect, DataMap};

/// A page holding exactly one rect that exceeds the configured maximum size
///
/// The page takes the rect's size as its own and refuses every further add.
#[derive(Debug, Clone)]
pub struct OversizedElementBin {
    options: PackingOptions,
    rects: [BinRect; 1],
    data: DataMap,
    dirty: u32,
}

impl OversizedElementBin {
    /// Wrap a rect, flagging it as oversized
    pub fn new(mut rect: BinRect) -> Self {
        rect.set_oversized(true);
        let options = PackingOptions {
            max_width: rect.width(),
            max_height: rect.height(),
            output_pages_as_power_of_two: false,
            ..PackingOptions::default()
        };
        Self {
            options,
            rects: [rect],
            data: DataMap::new(),
            dirty: 0,
        }
    }

    /// Wrap a bare `width x height` rect
    pub fn with_size(width: i32, height: i32) -> Self {
        Self::new(BinRect::new(width, height))
    }

    /// Attach a page payload, used when restoring saved state
    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = data;
        self
    }

    /// The wrapped rect
    pub fn rect(&self) -> &BinRect {
        &self.rects[0]
    }
}

impl Bin for OversizedElementBin {
    fn width(&self) -> i32 {
        self.rects[0].width()
    }

    fn height(&self) -> i32 {
        self.rects[0].height()
    }

    fn free_rects(&self) -> &[BinRect] {
        &[]
    }

    fn rects(&self) -> &[BinRect] {
        &self.rects
    }

    fn rects_mut(&mut self) -> &mut [BinRect] {
        &mut self.rects
    }

    fn options(&self) -> &PackingOptions {
        &self.options
    }

    fn data(&self) -> &DataMap {
        &self.data
    }

    fn data_mut(&mut self) -> &mut DataMap {
        &mut self.data
    }

    fn dirty_count(&self) -> u32 {
        self.dirty
    }

    fn set_dirty(&mut self, value: bool) {
        if value {
            self.dirty += 1;
        } else {
            self.dirty = 0;
            self.rects[0].set_dirty(false);
        }
    }

    fn add(&mut self, rect: BinRect) -> Result<&BinRect, BinRect> {
        Err(rect)
    }

    fn reset(&mut self, _deep: bool) {}

    fn repack(&mut self) -> Vec<BinRect> {
        Vec::new()
    }

    fn is_oversized(&self) -> bool {
        true
    }

    fn clone_bin(&self) -> Box<dyn Bin> {
        Box::new(Self::new(self.rects[0].clone()))
    }
}
