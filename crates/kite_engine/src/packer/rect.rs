//! Packable rectangle with dirty tracking
//!
//! [`BinRect`] is the unit of work for every bin: a mutable axis-aligned rectangle
//! that records each change to its geometry in a mutation counter so that bins can
//! tell which placements went stale since the last pack.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque payload value attached to a [`BinRect`]
///
/// The packer never reads these values; they ride along with the rect so callers can
/// map placements back to their own assets (sprite names, frame numbers, page hints).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Free-form text
    Text(String),
}

impl DataValue {
    /// Integer value, if this is an [`DataValue::Int`]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Text value, if this is a [`DataValue::Text`]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Boolean value, if this is a [`DataValue::Bool`]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for DataValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

/// Key/value payload carried by rects and bins
pub type DataMap = BTreeMap<String, DataValue>;

/// A mutable rectangle placed by the bin packers
///
/// Every setter is a no-op when the value does not change; otherwise it bumps an
/// internal dirty counter. The counter only goes back to zero through
/// [`BinRect::set_dirty`] with `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinRect {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    #[serde(default)]
    is_rotated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allow_rotation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: DataMap,
    #[serde(default)]
    dirty: u32,
    #[serde(default)]
    oversized: bool,
}

impl BinRect {
    /// Create an unplaced rect of the given size
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Create a rect at an explicit position
    pub fn with_position(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    /// Attach a payload entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attach a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Override the packer-wide rotation policy for this rect
    pub fn with_allow_rotation(mut self, allow: bool) -> Self {
        self.allow_rotation = Some(allow);
        self
    }

    /// Mark the rect as already rotated without swapping its dimensions
    ///
    /// The caller hands in the size it currently holds; the packer flips the flag
    /// back if it picks the other orientation.
    pub fn rotated(mut self) -> Self {
        self.is_rotated = true;
        self
    }

    /// Horizontal position
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Vertical position
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Width
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Whether the rect is stored rotated by 90 degrees
    pub fn is_rotated(&self) -> bool {
        self.is_rotated
    }

    /// Per-rect rotation override (`None` defers to the packing options)
    pub fn allow_rotation(&self) -> Option<bool> {
        self.allow_rotation
    }

    /// Optional tag
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Payload map
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// Mutable payload map (payload edits do not dirty the rect)
    pub fn data_mut(&mut self) -> &mut DataMap {
        &mut self.data
    }

    /// Look up a single payload entry
    pub fn data_value(&self, key: &str) -> Option<&DataValue> {
        self.data.get(key)
    }

    /// Whether the rect was routed to an oversized bin
    pub fn oversized(&self) -> bool {
        self.oversized
    }

    pub(crate) fn set_oversized(&mut self, oversized: bool) {
        self.oversized = oversized;
    }

    /// `width * height`
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    /// Longest side, used by the largest-first sort
    pub fn max_side(&self) -> i32 {
        self.width.max(self.height)
    }

    /// Set the horizontal position
    pub fn set_x(&mut self, value: i32) {
        if value == self.x {
            return;
        }
        self.x = value;
        self.dirty += 1;
    }

    /// Set the vertical position
    pub fn set_y(&mut self, value: i32) {
        if value == self.y {
            return;
        }
        self.y = value;
        self.dirty += 1;
    }

    /// Set the width
    pub fn set_width(&mut self, value: i32) {
        if value == self.width {
            return;
        }
        self.width = value;
        self.dirty += 1;
    }

    /// Set the height
    pub fn set_height(&mut self, value: i32) {
        if value == self.height {
            return;
        }
        self.height = value;
        self.dirty += 1;
    }

    /// Rotate or un-rotate the rect, swapping its dimensions
    ///
    /// Ignored when rotation is explicitly disallowed for this rect.
    pub fn set_rotated(&mut self, value: bool) {
        if self.allow_rotation == Some(false) || value == self.is_rotated {
            return;
        }
        let width = self.width;
        self.set_width(self.height);
        self.set_height(width);
        self.is_rotated = value;
        self.dirty += 1;
    }

    /// Set the per-rect rotation override
    pub fn set_allow_rotation(&mut self, value: Option<bool>) {
        if value == self.allow_rotation {
            return;
        }
        self.allow_rotation = value;
        self.dirty += 1;
    }

    /// Set the tag
    pub fn set_tag(&mut self, value: Option<String>) {
        if value == self.tag {
            return;
        }
        self.tag = value;
        self.dirty += 1;
    }

    /// Whether the rect changed since it was last marked clean
    pub fn dirty(&self) -> bool {
        self.dirty > 0
    }

    /// Raw mutation counter
    pub fn dirty_count(&self) -> u32 {
        self.dirty
    }

    /// `true` bumps the counter, `false` resets it to zero
    pub fn set_dirty(&mut self, value: bool) {
        self.dirty = if value { self.dirty + 1 } else { 0 };
    }

    /// Strict overlap test on both axes
    pub fn collides(&self, other: &Self) -> bool {
        other.x < self.x + self.width
            && other.x + other.width > self.x
            && other.y < self.y + self.height
            && other.y + other.height > self.y
    }

    /// Whether `other` lies fully inside this rect (boundaries inclusive)
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

impl fmt::Display for BinRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect(x={}, y={}, width={}, height={}, is_rotated={}, allow_rotation={:?}, tag={:?}, dirty={}, oversized={}, area={}, data={{",
            self.x,
            self.y,
            self.width,
            self.height,
            self.is_rotated,
            self.allow_rotation,
            self.tag,
            self.dirty(),
            self.oversized,
            self.area(),
        )?;
        for (index, (key, value)) in self.data.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}})")
    }
}
