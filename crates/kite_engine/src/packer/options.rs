//! Packing configuration

use crate::config::Config;
use serde::{Deserialize, Serialize};

/// Configuration for a packing run
///
/// `bleed`, `bleed_iterations` and `extrude` describe how the atlas image is written
/// and are carried through save/load untouched; the packers only read the page limits,
/// padding, edge border, rotation and power-of-two settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingOptions {
    /// Allow rects to be rotated by 90 degrees when that fits better
    pub allow_rotation: bool,

    /// Horizontal gap kept between neighbouring rects
    pub padding_horizontal: i32,

    /// Vertical gap kept between neighbouring rects
    pub padding_vertical: i32,

    /// Round page sizes up to the next power of two
    pub output_pages_as_power_of_two: bool,

    /// Maximum page width
    pub max_width: i32,

    /// Maximum page height
    pub max_height: i32,

    /// Empty margin kept around the page edge
    pub edge_border: i32,

    /// Bleed sprite edge pixels into the padding
    pub bleed: bool,

    /// Number of bleed passes
    pub bleed_iterations: u32,

    /// Pixels to extrude around each sprite
    pub extrude: u32,
}

impl PackingOptions {
    /// Create options with the default page settings
    pub fn new() -> Self {
        Self {
            allow_rotation: false,
            padding_horizontal: 2,
            padding_vertical: 2,
            output_pages_as_power_of_two: true,
            max_width: 4096,
            max_height: 4096,
            edge_border: 2,
            bleed: true,
            bleed_iterations: 2,
            extrude: 0,
        }
    }

    /// Set the maximum page size
    pub fn with_max_size(mut self, width: i32, height: i32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    /// Set both paddings
    pub fn with_padding(mut self, horizontal: i32, vertical: i32) -> Self {
        self.padding_horizontal = horizontal;
        self.padding_vertical = vertical;
        self
    }

    /// Set the edge border
    pub fn with_edge_border(mut self, edge_border: i32) -> Self {
        self.edge_border = edge_border;
        self
    }

    /// Enable or disable rotation
    pub fn with_rotation(mut self, allow: bool) -> Self {
        self.allow_rotation = allow;
        self
    }

    /// Enable or disable power-of-two page sizes
    pub fn with_power_of_two(mut self, enabled: bool) -> Self {
        self.output_pages_as_power_of_two = enabled;
        self
    }

    /// Set the bleed settings
    pub fn with_bleed(mut self, bleed: bool, iterations: u32) -> Self {
        self.bleed = bleed;
        self.bleed_iterations = iterations;
        self
    }

    /// Set the extrude amount
    pub fn with_extrude(mut self, extrude: u32) -> Self {
        self.extrude = extrude;
        self
    }

    /// Options with no padding, no edge border and exact page sizes
    pub fn tight(max_width: i32, max_height: i32) -> Self {
        Self::new()
            .with_max_size(max_width, max_height)
            .with_padding(0, 0)
            .with_edge_border(0)
            .with_power_of_two(false)
    }

    /// Validate the options, naming the first bad field
    pub fn validate(&self) -> Result<(), String> {
        if self.max_width <= 0 {
            return Err(format!("max_width must be positive, got {}", self.max_width));
        }
        if self.max_height <= 0 {
            return Err(format!("max_height must be positive, got {}", self.max_height));
        }
        if self.padding_horizontal < 0 {
            return Err(format!(
                "padding_horizontal must not be negative, got {}",
                self.padding_horizontal
            ));
        }
        if self.padding_vertical < 0 {
            return Err(format!(
                "padding_vertical must not be negative, got {}",
                self.padding_vertical
            ));
        }
        if self.edge_border < 0 {
            return Err(format!("edge_border must not be negative, got {}", self.edge_border));
        }
        if self.edge_border * 2 >= self.max_width || self.edge_border * 2 >= self.max_height {
            return Err(format!(
                "edge_border {} leaves no room on a {}x{} page",
                self.edge_border, self.max_width, self.max_height
            ));
        }
        Ok(())
    }
}

impl Default for PackingOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for PackingOptions {}
