//! Ear-clipping triangulation
//!
//! Triangulates simple polygons without holes, in either winding. Self-intersecting
//! input still produces triangles, just not meaningful ones. Very large or very
//! close-together coordinates can confuse the float winding test; translate such
//! polygons towards the origin first.

use crate::foundation::math::{flatten_points, Vec2};

/// How a polygon corner turns relative to the clockwise ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
enum VertexType {
    Concave = -1,
    Tangential = 0,
    Convex = 1,
}

impl VertexType {
    fn from_sign(sign: i8) -> Self {
        match sign {
            s if s > 0 => Self::Convex,
            s if s < 0 => Self::Concave,
            _ => Self::Tangential,
        }
    }
}

/// Reusable ear-clipping triangulator
///
/// The buffers are kept between calls, so the slice returned by
/// [`Triangulator::compute_triangles`] is only valid until the next call.
#[derive(Debug, Default, Clone)]
pub struct Triangulator {
    indices: Vec<u32>,
    vertex_types: Vec<VertexType>,
    triangles: Vec<u32>,
}

impl Triangulator {
    /// Create a triangulator with empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Triangulate the polygon stored in `vertices[offset..offset + count]`
    ///
    /// `vertices` holds interleaved `x, y` pairs and `offset`/`count` are measured in
    /// floats. The result is a flat list of clockwise index triples; each index points
    /// at a vertex pair of the whole `vertices` slice, so the first vertex of the
    /// polygon is `offset / 2`.
    pub fn compute_triangles(&mut self, vertices: &[f32], offset: usize, count: usize) -> &[u32] {
        let count = count.min(vertices.len().saturating_sub(offset));
        let vertex_count = count / 2;
        let vertex_offset = offset / 2;

        self.indices.clear();
        self.indices.reserve(vertex_count);
        let first = index_u32(vertex_offset);
        if is_clockwise(vertices, offset, count) {
            self.indices.extend((0..vertex_count).map(|i| first + index_u32(i)));
        } else {
            self.indices.extend((0..vertex_count).rev().map(|i| first + index_u32(i)));
        }

        self.vertex_types.clear();
        for i in 0..vertex_count {
            let kind = self.classify_vertex(vertices, i);
            self.vertex_types.push(kind);
        }

        self.triangles.clear();
        self.triangles.reserve(vertex_count.saturating_sub(2) * 3);
        self.triangulate(vertices);
        &self.triangles
    }

    /// Triangulate a whole interleaved vertex slice
    pub fn compute_triangles_all(&mut self, vertices: &[f32]) -> &[u32] {
        self.compute_triangles(vertices, 0, vertices.len())
    }

    /// Triangulate a polygon given as points
    pub fn compute_triangles_points(&mut self, points: &[Vec2]) -> &[u32] {
        let vertices = flatten_points(points);
        self.compute_triangles(&vertices, 0, vertices.len())
    }

    fn triangulate(&mut self, vertices: &[f32]) {
        while self.indices.len() > 3 {
            let ear_tip = self.find_ear_tip(vertices);
            self.cut_ear_tip(ear_tip);

            let previous = self.previous_index(ear_tip);
            let next = if ear_tip == self.indices.len() { 0 } else { ear_tip };
            self.vertex_types[previous] = self.classify_vertex(vertices, previous);
            self.vertex_types[next] = self.classify_vertex(vertices, next);
        }

        if self.indices.len() == 3 {
            self.triangles.extend_from_slice(&self.indices);
        }
    }

    fn find_ear_tip(&self, vertices: &[f32]) -> usize {
        if let Some(index) = (0..self.indices.len()).find(|&i| self.is_ear_tip(vertices, i)) {
            return index;
        }

        // Degenerate ring, possibly made so by earlier cuts: take any corner that is
        // not concave, or the first one when all of them are.
        self.vertex_types
            .iter()
            .position(|&kind| kind != VertexType::Concave)
            .unwrap_or(0)
    }

    fn is_ear_tip(&self, vertices: &[f32], ear_tip: usize) -> bool {
        if self.vertex_types[ear_tip] == VertexType::Concave {
            return false;
        }

        let previous = self.previous_index(ear_tip);
        let next = self.next_index(ear_tip);
        let p1 = point(vertices, self.indices[previous]);
        let p2 = point(vertices, self.indices[ear_tip]);
        let p3 = point(vertices, self.indices[next]);

        // Only vertices outside the candidate triangle are tested. Convex ones cannot
        // lie inside it; tangential ones can when they coincide with a corner.
        let mut i = self.next_index(next);
        while i != previous {
            if self.vertex_types[i] != VertexType::Convex {
                let v = point(vertices, self.indices[i]);
                // p3 -> p1 first, it rejects far more often than the other two edges
                if spanned_area_sign(p3, p1, v) >= 0
                    && spanned_area_sign(p1, p2, v) >= 0
                    && spanned_area_sign(p2, p3, v) >= 0
                {
                    return false;
                }
            }
            i = self.next_index(i);
        }
        true
    }

    fn cut_ear_tip(&mut self, ear_tip: usize) {
        let previous = self.indices[self.previous_index(ear_tip)];
        let next = self.indices[self.next_index(ear_tip)];
        self.triangles.extend_from_slice(&[previous, self.indices[ear_tip], next]);

        self.indices.remove(ear_tip);
        self.vertex_types.remove(ear_tip);
    }

    fn classify_vertex(&self, vertices: &[f32], index: usize) -> VertexType {
        let previous = point(vertices, self.indices[self.previous_index(index)]);
        let current = point(vertices, self.indices[index]);
        let next = point(vertices, self.indices[self.next_index(index)]);
        VertexType::from_sign(spanned_area_sign(previous, current, next))
    }

    fn previous_index(&self, index: usize) -> usize {
        if index == 0 {
            self.indices.len() - 1
        } else {
            index - 1
        }
    }

    fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.indices.len()
    }
}

/// Whether the polygon in `vertices[offset..offset + count]` winds clockwise
///
/// Clockwise here means a negative signed area in a y-up frame. Fewer than three
/// vertices never count as clockwise.
pub fn is_clockwise(vertices: &[f32], offset: usize, count: usize) -> bool {
    if count <= 4 {
        return false;
    }
    polygon_area(vertices, offset, count) < 0.0
}

/// Signed area of the polygon in `vertices[offset..offset + count]`
///
/// Positive for counter-clockwise rings in a y-up frame.
pub fn polygon_area(vertices: &[f32], offset: usize, count: usize) -> f32 {
    let count = count.min(vertices.len().saturating_sub(offset)) & !1;
    if count < 6 {
        return 0.0;
    }
    let last = offset + count - 2;
    let (mut x1, mut y1) = (vertices[last], vertices[last + 1]);
    let mut area = 0.0;
    for i in (offset..=last).step_by(2) {
        let (x2, y2) = (vertices[i], vertices[i + 1]);
        area += x1 * y2 - x2 * y1;
        x1 = x2;
        y1 = y2;
    }
    area * 0.5
}

fn point(vertices: &[f32], index: u32) -> (f32, f32) {
    let i = index as usize * 2;
    (vertices[i], vertices[i + 1])
}

/// Sign of twice the area spanned by three points
fn spanned_area_sign(p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)) -> i8 {
    let area = p1.0 * (p3.1 - p2.1) + p2.0 * (p1.1 - p3.1) + p3.0 * (p2.1 - p1.1);
    if area > 0.0 {
        1
    } else if area < 0.0 {
        -1
    } else {
        0
    }
}

fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
