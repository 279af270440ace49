//! MAXRECTS page packer
//!
//! Keeps a list of maximal free rectangles. Each placement picks the free rectangle
//! that leaves the least area unused (ties go to the one with the smallest leftover
//! short side), splits every free rectangle the new footprint touches into up to four
//! remainders, then drops free rectangles that sit inside another one.

use super::bin::{next_power_of_two, Bin};
use super::options::PackingOptions;
use super::rect::{BinRect, DataMap};
use crate::foundation::logging::warn;

/// Chosen spot for a padded footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    rotated: bool,
}

impl Placement {
    fn footprint(&self) -> BinRect {
        BinRect::with_position(self.x, self.y, self.width, self.height)
    }
}

/// A single page packed with the MAXRECTS best-area-fit heuristic
#[derive(Debug, Clone)]
pub struct MaxRectsBin {
    options: PackingOptions,
    width: i32,
    height: i32,
    free_rects: Vec<BinRect>,
    rects: Vec<BinRect>,
    data: DataMap,
    dirty: u32,
}

impl MaxRectsBin {
    /// Create an empty page
    pub fn new(options: PackingOptions) -> Self {
        let free_rects = vec![Self::page_free_rect(&options)];
        Self {
            options,
            width: 0,
            height: 0,
            free_rects,
            rects: Vec::new(),
            data: DataMap::new(),
            dirty: 0,
        }
    }

    /// Rebuild a page from persisted state so packing can continue where it stopped
    pub fn restore(
        options: PackingOptions,
        width: i32,
        height: i32,
        free_rects: Vec<BinRect>,
        rects: Vec<BinRect>,
        data: DataMap,
    ) -> Self {
        Self {
            options,
            width,
            height,
            free_rects,
            rects,
            data,
            dirty: 0,
        }
    }

    /// Convenience for adding a bare `width x height` rect
    pub fn add_size(&mut self, width: i32, height: i32) -> Result<&BinRect, BinRect> {
        self.add(BinRect::new(width, height))
    }

    /// Free space of an empty page
    ///
    /// The padding is added back on the far edges so a rect whose padded footprint
    /// reaches the page edge still fits.
    fn page_free_rect(options: &PackingOptions) -> BinRect {
        BinRect::with_position(
            options.edge_border,
            options.edge_border,
            options.max_width + options.padding_horizontal - options.edge_border * 2,
            options.max_height + options.padding_vertical - options.edge_border * 2,
        )
    }

    fn rotation_allowed(&self, rect: &BinRect) -> bool {
        rect.allow_rotation().unwrap_or(self.options.allow_rotation)
    }

    /// Best-area-fit search over every free rectangle in both orientations
    ///
    /// Takes the logical size; padding is applied per orientation so a rotated
    /// footprint still carries the horizontal padding on its width.
    fn find_placement(&self, width: i32, height: i32, allow_rotation: bool) -> Option<Placement> {
        let pad_h = self.options.padding_horizontal;
        let pad_v = self.options.padding_vertical;
        let mut best: Option<(i64, i32, Placement)> = None;
        let mut consider = |free: &BinRect, w: i32, h: i32, rotated: bool| {
            if free.width() < w || free.height() < h {
                return;
            }
            let area_fit = i64::from(free.width()) * i64::from(free.height()) - i64::from(w) * i64::from(h);
            let short_fit = (free.width() - w).min(free.height() - h);
            let better = best.map_or(true, |(area, short, _)| {
                area_fit < area || (area_fit == area && short_fit < short)
            });
            if better {
                let placement = Placement {
                    x: free.x(),
                    y: free.y(),
                    width: w,
                    height: h,
                    rotated,
                };
                best = Some((area_fit, short_fit, placement));
            }
        };

        for free in &self.free_rects {
            consider(free, width + pad_h, height + pad_v, false);
            if allow_rotation && width != height {
                consider(free, height + pad_h, width + pad_v, true);
            }
        }
        best.map(|(_, _, placement)| placement)
    }

    /// Carve a used footprint out of the free list and grow the page around it
    fn occupy(&mut self, used: &BinRect) {
        let mut remaining = self.free_rects.len();
        let mut i = 0;
        while i < remaining {
            if !self.free_rects[i].collides(used) {
                i += 1;
                continue;
            }
            let mut pieces = split_free_rect(&self.free_rects[i], used).into_iter();
            match pieces.next() {
                Some(first) => {
                    self.free_rects[i] = first;
                    self.free_rects.extend(pieces);
                    i += 1;
                }
                None => {
                    self.free_rects.remove(i);
                    remaining -= 1;
                }
            }
        }
        self.prune_free_list();
        self.grow_to(used);
    }

    fn grow_to(&mut self, used: &BinRect) {
        let options = &self.options;
        let mut width = self
            .width
            .max(used.x() + used.width() - options.padding_horizontal + options.edge_border);
        let mut height = self
            .height
            .max(used.y() + used.height() - options.padding_vertical + options.edge_border);
        if options.output_pages_as_power_of_two {
            width = next_power_of_two(width);
            height = next_power_of_two(height);
        }
        self.width = width.min(options.max_width);
        self.height = height.min(options.max_height);
    }

    /// Remove every free rectangle that lies inside another one
    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free_rects.len() {
            let mut j = i + 1;
            let mut removed_i = false;
            while j < self.free_rects.len() {
                if self.free_rects[j].contains(&self.free_rects[i]) {
                    self.free_rects.remove(i);
                    removed_i = true;
                    break;
                }
                if self.free_rects[i].contains(&self.free_rects[j]) {
                    self.free_rects.remove(j);
                } else {
                    j += 1;
                }
            }
            if !removed_i {
                i += 1;
            }
        }
    }

    /// Place a rect without storing it
    fn place(&mut self, rect: &mut BinRect) -> bool {
        let allow_rotation = self.rotation_allowed(rect);
        let Some(placement) = self.find_placement(rect.width(), rect.height(), allow_rotation) else {
            return false;
        };

        self.occupy(&placement.footprint());
        rect.set_x(placement.x);
        rect.set_y(placement.y);
        if placement.rotated {
            rect.set_rotated(!rect.is_rotated());
        }
        self.dirty += 1;
        true
    }

    /// Claim the spot a rect already sits on, if it is still free
    fn reserve(&mut self, rect: &BinRect) -> bool {
        let footprint = BinRect::with_position(
            rect.x(),
            rect.y(),
            rect.width() + self.options.padding_horizontal,
            rect.height() + self.options.padding_vertical,
        );
        if !self.free_rects.iter().any(|free| free.contains(&footprint)) {
            return false;
        }
        self.occupy(&footprint);
        true
    }

    fn clear_space(&mut self) {
        self.free_rects.clear();
        self.free_rects.push(Self::page_free_rect(&self.options));
    }
}

impl Default for MaxRectsBin {
    fn default() -> Self {
        Self::new(PackingOptions::default())
    }
}

/// Remainders of `free` left around `used`; empty when `used` covers it entirely
fn split_free_rect(free: &BinRect, used: &BinRect) -> Vec<BinRect> {
    let mut pieces = Vec::with_capacity(4);

    if used.x() < free.x() + free.width() && used.x() + used.width() > free.x() {
        // above
        if used.y() > free.y() && used.y() < free.y() + free.height() {
            pieces.push(BinRect::with_position(
                free.x(),
                free.y(),
                free.width(),
                used.y() - free.y(),
            ));
        }
        // below
        if used.y() + used.height() < free.y() + free.height() {
            pieces.push(BinRect::with_position(
                free.x(),
                used.y() + used.height(),
                free.width(),
                free.y() + free.height() - (used.y() + used.height()),
            ));
        }
    }

    if used.y() < free.y() + free.height() && used.y() + used.height() > free.y() {
        // left
        if used.x() > free.x() && used.x() < free.x() + free.width() {
            pieces.push(BinRect::with_position(
                free.x(),
                free.y(),
                used.x() - free.x(),
                free.height(),
            ));
        }
        // right
        if used.x() + used.width() < free.x() + free.width() {
            pieces.push(BinRect::with_position(
                used.x() + used.width(),
                free.y(),
                free.x() + free.width() - (used.x() + used.width()),
                free.height(),
            ));
        }
    }

    pieces
}

impl Bin for MaxRectsBin {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn free_rects(&self) -> &[BinRect] {
        &self.free_rects
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
            return;
        }
        self.dirty = 0;
        for rect in &mut self.rects {
            rect.set_dirty(false);
        }
    }

    fn add(&mut self, mut rect: BinRect) -> Result<&BinRect, BinRect> {
        if !self.place(&mut rect) {
            return Err(rect);
        }
        let index = self.rects.len();
        self.rects.push(rect);
        Ok(&self.rects[index])
    }

    fn reset(&mut self, deep: bool) {
        self.rects.clear();
        self.clear_space();
        self.dirty = 0;
        if deep {
            self.width = 0;
            self.height = 0;
            self.data.clear();
        }
    }

    /// Clean rects keep their spot when it is still free; everything else is placed
    /// again in insertion order. Dirty counters are left as they are.
    fn repack(&mut self) -> Vec<BinRect> {
        let rects = std::mem::take(&mut self.rects);
        self.clear_space();
        self.width = 0;
        self.height = 0;

        let mut slots: Vec<(BinRect, bool)> = rects
            .into_iter()
            .map(|rect| {
                let kept = !rect.dirty() && self.reserve(&rect);
                (rect, kept)
            })
            .collect();

        for (rect, placed) in &mut slots {
            if !*placed {
                *placed = self.place(rect);
            }
        }

        let mut unpacked = Vec::new();
        for (rect, placed) in slots {
            if placed {
                self.rects.push(rect);
            } else {
                unpacked.push(rect);
            }
        }
        unpacked
    }

    fn is_oversized(&self) -> bool {
        false
    }

    fn clone_bin(&self) -> Box<dyn Bin> {
        let mut bin = Self::new(self.options.clone());
        let rejected: Vec<BinRect> = self
            .rects
            .iter()
            .filter_map(|rect| bin.add(rect.clone()).err())
            .collect();
        for rect in &rejected {
            warn!("Dropping {rect} from cloned page: it no longer fits");
        }
        Box::new(bin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::rect::DataValue;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn tight_options() -> PackingOptions {
        PackingOptions::new()
            .with_max_size(1024, 1024)
            .with_padding(0, 0)
            .with_edge_border(0)
    }

    fn assert_no_overlap(bin: &MaxRectsBin) {
        let options = bin.options();
        let footprints: Vec<BinRect> = bin
            .rects()
            .iter()
            .map(|r| {
                BinRect::with_position(
                    r.x(),
                    r.y(),
                    r.width() + options.padding_horizontal,
                    r.height() + options.padding_vertical,
                )
            })
            .collect();
        for (i, a) in footprints.iter().enumerate() {
            for b in &footprints[i + 1..] {
                assert!(!a.collides(b), "{a} overlaps {b}");
            }
        }
        for rect in bin.rects() {
            assert!(rect.x() >= 0 && rect.y() >= 0);
            assert!(rect.x() + rect.width() <= bin.width(), "{rect} outside width {}", bin.width());
            assert!(rect.y() + rect.height() <= bin.height(), "{rect} outside height {}", bin.height());
        }
        for free in bin.free_rects() {
            for used in &footprints {
                assert!(!free.collides(used), "free {free} overlaps used {used}");
            }
        }
    }

    #[test]
    fn test_is_initially_empty() {
        let bin = MaxRectsBin::new(tight_options());
        assert_eq!(bin.width(), 0);
        assert_eq!(bin.height(), 0);
        assert_eq!(bin.free_rects().len(), 1);
        assert!(!bin.dirty());
    }

    #[test]
    fn test_adds_rect_at_origin() {
        let mut bin = MaxRectsBin::new(tight_options());
        let placed = bin.add(BinRect::new(200, 100)).unwrap();
        assert_eq!((placed.x(), placed.y()), (0, 0));
    }

    #[test]
    fn test_updates_size_to_power_of_two() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add_size(200, 100).unwrap();
        assert_eq!(bin.width(), 256);
        assert_eq!(bin.height(), 128);
    }

    #[test]
    fn test_exact_size_without_power_of_two() {
        let mut bin = MaxRectsBin::new(tight_options().with_power_of_two(false));
        bin.add_size(200, 100).unwrap();
        assert_eq!((bin.width(), bin.height()), (200, 100));
    }

    #[test]
    fn test_edge_border_and_padding_offset_placements() {
        let options = PackingOptions::new().with_max_size(256, 256).with_power_of_two(false);
        let mut bin = MaxRectsBin::new(options);
        let first = bin.add_size(100, 100).unwrap().clone();
        assert_eq!((first.x(), first.y()), (2, 2));
        assert_eq!((bin.width(), bin.height()), (104, 104));

        let second = bin.add_size(100, 100).unwrap().clone();
        assert!(second.x() == 104 || second.y() == 104);
        assert_no_overlap(&bin);
    }

    #[test]
    fn test_bin_dirty_status() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add_size(200, 100).unwrap();
        assert!(bin.dirty());
        bin.set_dirty(false);
        assert!(!bin.dirty());

        bin.add_size(200, 100).unwrap();
        assert!(bin.dirty());
        bin.set_dirty(false);
        bin.set_dirty(true);
        assert!(bin.dirty());

        bin.reset(false);
        assert!(!bin.dirty());

        bin.add_size(200, 100).unwrap();
        bin.set_dirty(false);
        bin.rects_mut()[0].set_width(256);
        assert!(bin.dirty());
    }

    #[test]
    fn test_stores_data_and_tags() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add(BinRect::new(200, 100).with_data("id", 1).with_tag("test")).unwrap();
        bin.add(BinRect::new(200, 100).with_data("id", 2)).unwrap();
        assert_eq!(bin.rects().len(), 2);
        assert_eq!(bin.rects()[0].data_value("id"), Some(&DataValue::Int(1)));
        assert_eq!(bin.rects()[0].tag(), Some("test"));
        assert_eq!(bin.rects()[1].data_value("id"), Some(&DataValue::Int(2)));
        assert_eq!(bin.rects()[1].tag(), None);
    }

    #[test]
    fn test_sets_rotation() {
        let mut bin = MaxRectsBin::new(tight_options().with_rotation(true));
        bin.add_size(512, 1024).unwrap();
        bin.add_size(1024, 512).unwrap();
        assert_eq!(bin.rects().len(), 2);
        assert!(bin.rects()[1].is_rotated());
        assert_eq!((bin.rects()[1].width(), bin.rects()[1].height()), (512, 1024));

        bin.reset(true);
        bin.add_size(512, 1024).unwrap();
        bin.add(BinRect::new(1024, 512).rotated()).unwrap();
        assert_eq!(bin.rects().len(), 2);
        assert!(!bin.rects()[1].is_rotated());
    }

    #[test]
    fn test_rect_override_blocks_rotation() {
        let mut bin = MaxRectsBin::new(tight_options().with_rotation(true));
        bin.add_size(512, 1024).unwrap();
        let refused = bin.add(BinRect::new(1024, 512).with_allow_rotation(false));
        assert!(refused.is_err());
    }

    #[test]
    fn test_fits_squares() {
        let mut bin = MaxRectsBin::new(tight_options());
        let mut count = 0;
        while bin.add(BinRect::new(100, 100).with_data("number", count)).is_ok() {
            count += 1;
            if count == 1000 {
                break;
            }
        }
        assert_eq!(count, 100);
        assert_eq!(bin.rects().len(), 100);
        assert_eq!((bin.width(), bin.height()), (1024, 1024));
        for (index, rect) in bin.rects().iter().enumerate() {
            assert_eq!(rect.data_value("number"), Some(&index.into()));
        }
        assert_no_overlap(&bin);
    }

    #[test]
    fn test_rejected_rect_is_handed_back() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add_size(1024, 1024).unwrap();
        let refused = bin.add(BinRect::new(10, 10).with_tag("late")).unwrap_err();
        assert_eq!(refused.tag(), Some("late"));
        assert_eq!(bin.rects().len(), 1);
    }

    #[test]
    fn test_reset_and_deep_reset() {
        let mut bin = MaxRectsBin::new(tight_options());
        for _ in 0..3 {
            bin.add_size(200, 100).unwrap();
        }
        assert_eq!(bin.rects().len(), 3);
        assert_eq!(bin.width(), 512);
        bin.data_mut().insert("page".to_string(), 0.into());

        bin.reset(false);
        assert!(bin.rects().is_empty());
        assert_eq!(bin.free_rects().len(), 1);
        assert_eq!(bin.width(), 512);
        assert_eq!(bin.data().len(), 1);

        bin.reset(true);
        assert_eq!((bin.width(), bin.height()), (0, 0));
        assert!(bin.data().is_empty());
    }

    #[test]
    fn test_repack_keeps_clean_rects_in_place() {
        let mut bin = MaxRectsBin::new(tight_options());
        for id in ["one", "two", "three"] {
            bin.add(BinRect::new(512, 512).with_data("id", id)).unwrap();
        }
        bin.set_dirty(false);
        let before: Vec<(i32, i32)> = bin.rects().iter().map(|r| (r.x(), r.y())).collect();

        bin.rects_mut()[1].set_width(1014);
        bin.rects_mut()[1].set_height(513);
        let unpacked = bin.repack();

        assert_eq!(unpacked.len(), 1);
        assert_eq!(unpacked[0].data_value("id").and_then(|v| v.as_str()), Some("two"));
        assert_eq!(bin.rects().len(), 2);
        assert_eq!((bin.rects()[0].x(), bin.rects()[0].y()), before[0]);
        assert_eq!((bin.rects()[1].x(), bin.rects()[1].y()), before[2]);
        assert_no_overlap(&bin);
    }

    #[test]
    fn test_repack_moves_grown_rect() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add_size(256, 256).unwrap();
        bin.add_size(256, 256).unwrap();
        bin.set_dirty(false);

        bin.rects_mut()[0].set_width(512);
        let unpacked = bin.repack();

        assert!(unpacked.is_empty());
        assert_eq!(bin.rects().len(), 2);
        assert_eq!(bin.rects()[0].width(), 512);
        assert!(bin.rects()[0].dirty());
        assert_no_overlap(&bin);
    }

    #[test]
    fn test_clone_bin_replaces_everything() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add_size(300, 300).unwrap();
        bin.add_size(100, 700).unwrap();
        let copy = bin.clone_bin();
        assert_eq!(copy.rects().len(), 2);
        assert_eq!((copy.width(), copy.height()), (bin.width(), bin.height()));
        assert!(!copy.is_oversized());
    }

    #[test]
    fn test_clone_bin_skips_rect_grown_past_the_page() {
        let mut bin = MaxRectsBin::new(tight_options());
        bin.add_size(300, 300).unwrap();
        bin.add_size(100, 700).unwrap();
        bin.rects_mut()[0].set_width(2000);

        let copy = bin.clone_bin();
        assert_eq!(copy.rects().len(), 1);
        assert_eq!((copy.rects()[0].width(), copy.rects()[0].height()), (100, 700));
        assert_eq!(bin.rects().len(), 2);
    }

    #[test]
    fn test_monkey_containment() {
        let mut rng = StdRng::seed_from_u64(0x6b69_7465);
        for round in 0..20 {
            let options = PackingOptions::new()
                .with_max_size(512, 512)
                .with_padding(rng.gen_range(0..4), rng.gen_range(0..4))
                .with_edge_border(rng.gen_range(0..4))
                .with_rotation(round % 2 == 0);
            let mut bin = MaxRectsBin::new(options);
            for _ in 0..200 {
                let width = rng.gen_range(1..120);
                let height = rng.gen_range(1..120);
                let _ = bin.add_size(width, height);
            }
            assert!(!bin.rects().is_empty());
            assert_no_overlap(&bin);
        }
    }
}
