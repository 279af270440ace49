//! Multi-page packer

use super::bin::Bin;
use super::max_rects_bin::MaxRectsBin;
use super::options::PackingOptions;
use super::oversized::OversizedElementBin;
use super::rect::{BinRect, DataMap};
use super::state::SavedBin;
use crate::foundation::logging::{debug, info};

/// Routes rects across as many pages as needed
///
/// Rects that fit the page limit go into the first page from the cursor onward that
/// accepts them, opening a new [`MaxRectsBin`] when none does. Rects bigger than the
/// limit get an [`OversizedElementBin`] of their own.
#[derive(Debug)]
pub struct MaxRectsPacker {
    options: PackingOptions,
    bins: Vec<Box<dyn Bin>>,
    current_bin_index: usize,
}

impl MaxRectsPacker {
    /// Create a packer with no pages
    pub fn new(options: PackingOptions) -> Self {
        Self {
            options,
            bins: Vec::new(),
            current_bin_index: 0,
        }
    }

    /// Options new pages are created with
    pub fn options(&self) -> &PackingOptions {
        &self.options
    }

    /// All pages in creation order
    pub fn bins(&self) -> &[Box<dyn Bin>] {
        &self.bins
    }

    /// All pages, mutable
    pub fn bins_mut(&mut self) -> &mut [Box<dyn Bin>] {
        &mut self.bins
    }

    /// Every placed rect across all pages
    pub fn rects(&self) -> impl Iterator<Item = &BinRect> + '_ {
        self.bins.iter().flat_map(|bin| bin.rects().iter())
    }

    /// Widest page width
    pub fn width(&self) -> i32 {
        self.bins.iter().map(|bin| bin.width()).max().unwrap_or(0)
    }

    /// Tallest page height
    pub fn height(&self) -> i32 {
        self.bins.iter().map(|bin| bin.height()).max().unwrap_or(0)
    }

    /// Whether any page changed since it was last marked clean
    pub fn dirty(&self) -> bool {
        self.bins.iter().any(|bin| bin.dirty())
    }

    /// First page index that adds may still go into
    pub fn current_bin_index(&self) -> usize {
        self.current_bin_index
    }

    /// Place a rect, opening pages as needed
    pub fn add(&mut self, rect: BinRect) -> &BinRect {
        let index = self.route(rect);
        let rects = self.bins[index].rects();
        &rects[rects.len() - 1]
    }

    /// Place a bare `width x height` rect carrying `data`
    pub fn add_size(&mut self, width: i32, height: i32, data: DataMap) -> &BinRect {
        let mut rect = BinRect::new(width, height);
        *rect.data_mut() = data;
        self.add(rect)
    }

    /// Sort a copy of `rects` largest side first and place them one by one
    pub fn add_all(&mut self, rects: &[BinRect]) {
        for rect in Self::sort(rects) {
            self.route(rect);
        }
    }

    /// Stable copy of `rects` ordered by descending longest side
    pub fn sort(rects: &[BinRect]) -> Vec<BinRect> {
        let mut sorted = rects.to_vec();
        sorted.sort_by(|a, b| b.max_side().cmp(&a.max_side()));
        sorted
    }

    /// Force later adds into fresh pages, returning the new cursor
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> usize {
        self.current_bin_index = self.bins.len();
        self.current_bin_index
    }

    /// Repack dirty pages
    ///
    /// A quick repack lets every dirty page re-place its own rects and then adds the
    /// overflow like new rects. A full repack, if anything is dirty, packs every rect
    /// again from nothing.
    pub fn repack(&mut self, quick: bool) {
        if quick {
            let mut unpacked = Vec::new();
            for bin in &mut self.bins {
                if bin.dirty() {
                    unpacked.extend(bin.repack());
                }
            }
            self.add_all(&unpacked);
            return;
        }

        if !self.dirty() {
            return;
        }
        let rects: Vec<BinRect> = self.rects().cloned().collect();
        self.reset();
        self.add_all(&rects);
    }

    /// Drop every page and move the cursor back to the start
    pub fn reset(&mut self) {
        self.bins.clear();
        self.current_bin_index = 0;
    }

    /// Snapshot every page
    pub fn save(&self) -> Vec<SavedBin> {
        self.bins.iter().map(|bin| SavedBin::from_bin(bin.as_ref())).collect()
    }

    /// Replace the pages with saved ones so packing can continue on top of them
    ///
    /// Saved pages that are flagged oversized, or that are larger than this packer's
    /// page limit, come back as [`OversizedElementBin`]s.
    pub fn load(&mut self, saved: &[SavedBin]) {
        self.reset();
        for bin in saved {
            let oversized = bin.oversized
                || bin.max_width > self.options.max_width
                || bin.max_height > self.options.max_height;
            if oversized {
                debug!("Restoring {}x{} page as oversized", bin.width, bin.height);
                let restored = bin
                    .rects
                    .first()
                    .cloned()
                    .map_or_else(
                        || OversizedElementBin::with_size(bin.width, bin.height),
                        OversizedElementBin::new,
                    )
                    .with_data(bin.data.clone());
                self.bins.push(Box::new(restored));
            } else {
                self.bins.push(Box::new(MaxRectsBin::restore(
                    bin.options.clone(),
                    bin.width,
                    bin.height,
                    bin.free_rects.clone(),
                    bin.rects.clone(),
                    bin.data.clone(),
                )));
            }
        }
    }

    /// Place a rect and return the index of the page that took it
    fn route(&mut self, mut rect: BinRect) -> usize {
        if rect.width() > self.options.max_width || rect.height() > self.options.max_height {
            info!(
                "Rect {}x{} exceeds the {}x{} page limit, giving it its own page",
                rect.width(),
                rect.height(),
                self.options.max_width,
                self.options.max_height
            );
            return self.push_oversized(rect);
        }
        rect.set_oversized(false);

        match self.place_in_existing(rect) {
            Ok(index) => index,
            Err(rect) => self.open_bin(rect),
        }
    }

    fn place_in_existing(&mut self, mut rect: BinRect) -> Result<usize, BinRect> {
        for index in self.current_bin_index..self.bins.len() {
            match self.bins[index].add(rect) {
                Ok(_) => return Ok(index),
                Err(back) => rect = back,
            }
        }
        Err(rect)
    }

    fn open_bin(&mut self, rect: BinRect) -> usize {
        let mut bin = MaxRectsBin::new(self.options.clone());
        match bin.add(rect) {
            Ok(_) => {
                debug!("Opened page {}", self.bins.len());
                self.bins.push(Box::new(bin));
                self.bins.len() - 1
            }
            Err(rect) => {
                info!(
                    "Rect {}x{} does not fit inside the page border, giving it its own page",
                    rect.width(),
                    rect.height()
                );
                self.push_oversized(rect)
            }
        }
    }

    fn push_oversized(&mut self, rect: BinRect) -> usize {
        self.bins.push(Box::new(OversizedElementBin::new(rect)));
        self.bins.len() - 1
    }
}

impl Default for MaxRectsPacker {
    fn default() -> Self {
        Self::new(PackingOptions::default())
    }
}
