//! Polygon offset and boolean operations.
//!
//! This module wraps the geo-clipper library behind the planner's scaled
//! integer [`Shape`] type. The wall generator uses these operations for:
//! - Outline preparation (morphological opening, self-intersection repair)
//! - Bead centerline placement (inward offsets)
//! - Residual contour computation

use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

use crate::geometry::{Point, Polygon, Shape};
use crate::{scale, unscale, CoordF};

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    Round,
    /// Mitered corners
    #[default]
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25), // Default arc tolerance
            OffsetJoinType::Miter => JoinType::Miter(2.0),  // Default miter limit
        }
    }
}

fn ring_to_linestring(polygon: &Polygon) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = polygon
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();

    // Close the ring if needed
    if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
        if first != last {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

/// Convert a Shape to geo's MultiPolygon, grouping holes under their outer
/// boundaries so clipper treats the set correctly.
fn shape_to_geo_multi(shape: &Shape) -> MultiPolygon<f64> {
    let polygons = shape
        .group_with_holes()
        .into_iter()
        .map(|(outer, holes)| {
            let interiors = holes.iter().map(ring_to_linestring).collect();
            GeoPolygon::new(ring_to_linestring(&outer), interiors)
        })
        .collect();
    MultiPolygon::new(polygons)
}

fn linestring_to_ring(ring: &LineString<f64>) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();

    // Remove the closing point if present (our Polygon doesn't store it)
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polygon::from_points(points)
}

/// Convert geo's MultiPolygon back to a Shape with normalized windings:
/// outer boundaries counter-clockwise, holes clockwise.
fn geo_multi_to_shape(multi: &MultiPolygon<f64>) -> Shape {
    let mut shape = Shape::new();
    for geo_poly in &multi.0 {
        let mut contour = linestring_to_ring(geo_poly.exterior());
        if contour.len() >= 3 {
            if !contour.is_ccw() {
                contour.reverse();
            }
            shape.push(contour);
        }
        for interior in geo_poly.interiors() {
            let mut hole = linestring_to_ring(interior);
            if hole.len() >= 3 {
                if hole.is_ccw() {
                    hole.reverse();
                }
                shape.push(hole);
            }
        }
    }
    shape
}

/// Offset a shape by a given distance.
///
/// Positive delta inflates (grows) the shape, negative delta deflates
/// (shrinks) it. The delta is in mm.
pub fn offset(shape: &Shape, delta: CoordF, join_type: OffsetJoinType) -> Shape {
    if shape.is_empty() {
        return Shape::new();
    }
    let geo_multi = shape_to_geo_multi(shape);
    let jt = join_type.into();

    let result = geo_multi.offset(delta, jt, EndType::ClosedPolygon, 1000.0);
    geo_multi_to_shape(&result)
}

/// Shrink (inset) a shape by a given distance (mm).
pub fn shrink(shape: &Shape, distance: CoordF, join_type: OffsetJoinType) -> Shape {
    offset(shape, -distance.abs(), join_type)
}

/// Grow (outset) a shape by a given distance (mm).
pub fn grow(shape: &Shape, distance: CoordF, join_type: OffsetJoinType) -> Shape {
    offset(shape, distance.abs(), join_type)
}

/// Union a shape with itself, resolving self-intersections and overlaps.
pub fn self_union(shape: &Shape) -> Shape {
    if shape.is_empty() {
        return Shape::new();
    }
    let geo_multi = shape_to_geo_multi(shape);
    let empty = MultiPolygon::<f64>::new(vec![]);
    let result = geo_multi.union(&empty, 1000.0);
    geo_multi_to_shape(&result)
}

/// Morphological opening: shrink then grow by the same amount (mm).
///
/// This removes features narrower than twice the distance while preserving
/// the overall geometry.
pub fn opening(shape: &Shape, distance: CoordF, join_type: OffsetJoinType) -> Shape {
    if shape.is_empty() || distance <= 0.0 {
        return shape.clone();
    }
    let shrunk = shrink(shape, distance, join_type);
    grow(&shrunk, distance, join_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::scale;

    fn square_mm(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::rectangle(
            Point::new(scale(x), scale(y)),
            Point::new(scale(x + size), scale(y + size)),
        )
    }

    #[test]
    fn test_shrink_square() {
        let shape = Shape::from_polygons(vec![square_mm(0.0, 0.0, 10.0)]);
        let shrunk = shrink(&shape, 1.0, OffsetJoinType::Miter);
        assert_eq!(shrunk.len(), 1);
        // 10mm square shrunk by 1mm on each side → 8×8 = 64mm²
        assert!((shrunk.area_mm2() - 64.0).abs() < 0.5);
    }

    #[test]
    fn test_shrink_to_nothing() {
        let shape = Shape::from_polygons(vec![square_mm(0.0, 0.0, 1.0)]);
        let shrunk = shrink(&shape, 0.6, OffsetJoinType::Miter);
        assert!(shrunk.is_empty());
    }

    #[test]
    fn test_offset_preserves_holes() {
        let mut hole = square_mm(3.0, 3.0, 4.0);
        hole.reverse();
        let shape = Shape::from_polygons(vec![square_mm(0.0, 0.0, 10.0), hole]);
        let shrunk = shrink(&shape, 0.5, OffsetJoinType::Miter);
        // Hole grows when the shape shrinks: 9×9 − 5×5 = 56mm²
        assert_eq!(shrunk.len(), 2);
        assert!((shrunk.area_mm2() - 56.0).abs() < 0.5);
    }

    #[test]
    fn test_opening_removes_thin_features() {
        // A 10mm square with a 0.02mm sliver sticking out.
        let shape = Shape::from_polygons(vec![Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(scale(10.0), 0),
            Point::new(scale(10.0), scale(5.0)),
            Point::new(scale(12.0), scale(5.0)),
            Point::new(scale(12.0), scale(5.02)),
            Point::new(scale(10.0), scale(5.02)),
            Point::new(scale(10.0), scale(10.0)),
            Point::new(0, scale(10.0)),
        ])]);
        let opened = opening(&shape, 0.024, OffsetJoinType::Miter);
        assert_eq!(opened.len(), 1);
        // The sliver (2 × 0.02 mm²) is gone, the square survives.
        assert!((opened.area_mm2() - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_self_union_merges_overlaps() {
        let shape = Shape::from_polygons(vec![
            square_mm(0.0, 0.0, 10.0),
            square_mm(5.0, 0.0, 10.0), // overlapping neighbour
        ]);
        let merged = self_union(&shape);
        assert_eq!(merged.len(), 1);
        assert!((merged.area_mm2() - 150.0).abs() < 0.5);
    }
}
