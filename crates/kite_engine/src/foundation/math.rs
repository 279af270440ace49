//! Math types
//!
//! 2D vector aliases over nalgebra used by the geometry helpers.

pub use nalgebra::Vector2;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 2D point type
pub type Point2 = nalgebra::Point2<f32>;

/// Flatten points into interleaved `x, y` pairs
pub fn flatten_points(points: &[Vec2]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}
