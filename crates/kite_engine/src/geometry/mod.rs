//! Polygon geometry
//!
//! Ear-clipping triangulation of simple polygons, plus winding and area helpers.

pub mod triangulator;

pub use triangulator::{is_clockwise, polygon_area, Triangulator};
