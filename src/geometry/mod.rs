//! Geometry primitives for the planner.
//!
//! This module provides the fundamental geometric types used throughout the
//! path-planning pipeline:
//! - [`Point`] and [`Point3`] - 2D and 3D points with integer coordinates (scaled)
//! - [`PointF`] - 2D point with floating-point coordinates (unscaled)
//! - [`Polygon`] - Closed polygon (boundary)
//! - [`Shape`] - A set of polygons interpreted by the even-odd rule
//! - [`SparsePointGrid`] - Spatial hash for nearest-endpoint queries
//!
//! ## Coordinate System
//!
//! The planner uses scaled integer coordinates internally to avoid
//! floating-point precision issues. Coordinates are scaled by
//! `SCALING_FACTOR` (1,000), so 1 unit = 1 micrometer.
//!
//! - Use `scale()` to convert from mm to internal units
//! - Use `unscale()` to convert from internal units to mm

mod grid;
mod point;
mod polygon;

pub use grid::SparsePointGrid;
pub use point::{Point, Point3, PointF};
pub use polygon::{Polygon, Shape};

use crate::{Coord, CoordF};

/// Calculate the cross product of two 2D vectors (returns a scalar).
/// This is useful for determining the orientation of three points.
#[inline]
pub fn cross2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.y as i128 - v1.y as i128 * v2.x as i128
}

/// Calculate the dot product of two 2D vectors.
#[inline]
pub fn dot2(v1: Point, v2: Point) -> i128 {
    v1.x as i128 * v2.x as i128 + v1.y as i128 * v2.y as i128
}

/// Linear interpolation between two points.
#[inline]
pub fn lerp(a: Point, b: Point, t: CoordF) -> Point {
    Point::new(
        (a.x as CoordF + (b.x - a.x) as CoordF * t).round() as Coord,
        (a.y as CoordF + (b.y - a.y) as CoordF * t).round() as Coord,
    )
}

/// Squared distance from a point to a line segment.
pub fn distance_to_segment_squared(p: Point, a: Point, b: Point) -> CoordF {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = dot2(ab, ab) as CoordF;
    if ab_len2 <= 0.0 {
        return dot2(ap, ap) as CoordF;
    }
    let t = (dot2(ap, ab) as CoordF / ab_len2).clamp(0.0, 1.0);
    let closest = lerp(a, b, t);
    let d = p - closest;
    dot2(d, d) as CoordF
}

/// Orientation of three points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Counter-clockwise (left turn)
    CounterClockwise,
    /// Clockwise (right turn)
    Clockwise,
    /// Collinear (no turn)
    Collinear,
}

/// Determine the orientation of three points.
pub fn orientation(p1: Point, p2: Point, p3: Point) -> Orientation {
    let cross = cross2(p2 - p1, p3 - p2);
    if cross > 0 {
        Orientation::CounterClockwise
    } else if cross < 0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}
