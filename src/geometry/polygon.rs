//! Closed polygons and even-odd polygon sets.

use serde::{Deserialize, Serialize};

use super::{distance_to_segment_squared, orientation, Orientation, Point};
use crate::{Coord, CoordF, SCALING_FACTOR};

/// A closed polygon: an ordered sequence of points, implicitly closed.
///
/// The closing point is not stored. Positive (counter-clockwise) winding
/// denotes an outer boundary, negative winding a hole.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create an empty polygon.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a polygon from a list of points.
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create an axis-aligned rectangle from two opposite corners.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self {
            points: vec![
                Point::new(min.x, min.y),
                Point::new(max.x, min.y),
                Point::new(max.x, max.y),
                Point::new(min.x, max.y),
            ],
        }
    }

    /// The vertices of this polygon.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Mutable access to the vertices.
    pub fn points_mut(&mut self) -> &mut Vec<Point> {
        &mut self.points
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append a vertex.
    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    /// Signed area in scaled units² (positive for counter-clockwise winding).
    pub fn area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut sum: i128 = 0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            sum += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        sum as CoordF / 2.0
    }

    /// Signed area in mm².
    pub fn area_mm2(&self) -> CoordF {
        self.area() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    /// Total boundary length in scaled units.
    pub fn perimeter(&self) -> CoordF {
        if self.points.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            total += a.distance(&b);
        }
        total
    }

    /// True if the winding is counter-clockwise (positive area).
    pub fn is_ccw(&self) -> bool {
        self.area() > 0.0
    }

    /// Reverse the winding.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Even-odd point containment. Points exactly on the boundary are not
    /// considered inside.
    pub fn contains(&self, p: Point) -> bool {
        let mut inside = false;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) as CoordF / (b.y - a.y) as CoordF;
                let cross_x = a.x as CoordF + t * (b.x - a.x) as CoordF;
                if (p.x as CoordF) < cross_x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from a point to the polygon boundary, in scaled units.
    pub fn distance_to_boundary(&self, p: Point) -> CoordF {
        if self.points.is_empty() {
            return CoordF::INFINITY;
        }
        if self.points.len() == 1 {
            return p.distance(&self.points[0]);
        }
        let mut best = CoordF::INFINITY;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.points[(i + 1) % self.points.len()];
            best = best.min(distance_to_segment_squared(p, a, b));
        }
        best.sqrt()
    }

    /// Remove consecutive duplicate vertices and colinear vertices.
    pub fn remove_degenerate(&mut self) {
        if self.points.len() < 3 {
            return;
        }

        // Consecutive duplicates first, including the wrap-around pair.
        self.points.dedup();
        if self.points.len() > 1 && self.points.first() == self.points.last() {
            self.points.pop();
        }

        // Colinear vertices, repeated until stable.
        loop {
            if self.points.len() < 3 {
                return;
            }
            let n = self.points.len();
            let mut removed = false;
            let mut kept = Vec::with_capacity(n);
            for i in 0..n {
                let prev = self.points[(i + n - 1) % n];
                let cur = self.points[i];
                let next = self.points[(i + 1) % n];
                if !removed && orientation(prev, cur, next) == Orientation::Collinear {
                    removed = true;
                    continue;
                }
                kept.push(cur);
            }
            self.points = kept;
            if !removed {
                return;
            }
        }
    }

    /// Remove vertices that terminate segments shorter than
    /// `smallest_segment`, as long as the removal moves the boundary by at
    /// most `allowed_distance`. Both arguments are in scaled units.
    pub fn simplify(&mut self, smallest_segment: Coord, allowed_distance: Coord) {
        let allowed2 = (allowed_distance as CoordF) * (allowed_distance as CoordF);
        let smallest2 = (smallest_segment as i128) * (smallest_segment as i128);
        loop {
            let n = self.points.len();
            if n < 3 {
                return;
            }
            let mut best: Option<(usize, CoordF)> = None;
            for i in 0..n {
                let prev = self.points[(i + n - 1) % n];
                let cur = self.points[i];
                let next = self.points[(i + 1) % n];
                let short = prev.distance_squared(&cur) < smallest2
                    || cur.distance_squared(&next) < smallest2;
                if !short {
                    continue;
                }
                let deviation2 = distance_to_segment_squared(cur, prev, next);
                if deviation2 <= allowed2 {
                    match best {
                        Some((_, d)) if d <= deviation2 => {}
                        _ => best = Some((i, deviation2)),
                    }
                }
            }
            match best {
                Some((i, _)) => {
                    self.points.remove(i);
                }
                None => return,
            }
        }
    }
}

/// A set of polygons interpreted by the even-odd rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    polygons: Vec<Polygon>,
}

impl Shape {
    /// Create an empty shape.
    pub fn new() -> Self {
        Self {
            polygons: Vec::new(),
        }
    }

    /// Create a shape from polygons.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    /// The polygons of this shape.
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Mutable access to the polygons.
    pub fn polygons_mut(&mut self) -> &mut Vec<Polygon> {
        &mut self.polygons
    }

    /// Append a polygon.
    pub fn push(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    /// True if the shape holds no polygons.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Number of polygons.
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    /// Total signed area in scaled units².
    pub fn area(&self) -> CoordF {
        self.polygons.iter().map(|p| p.area()).sum()
    }

    /// Total signed area in mm².
    pub fn area_mm2(&self) -> CoordF {
        self.area() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    /// Even-odd point containment over the whole set.
    pub fn contains(&self, p: Point) -> bool {
        let mut depth = 0usize;
        for polygon in &self.polygons {
            if polygon.contains(p) {
                depth += 1;
            }
        }
        depth % 2 == 1
    }

    /// Drop polygons whose absolute area is below `min_area` (scaled units²).
    pub fn remove_small_areas(&mut self, min_area: CoordF) {
        self.polygons.retain(|p| p.area().abs() >= min_area);
    }

    /// Containment depth of each polygon: the number of *other* polygons of
    /// this shape that contain its first vertex.
    fn depths(&self) -> Vec<usize> {
        let mut depths = vec![0usize; self.polygons.len()];
        for (i, polygon) in self.polygons.iter().enumerate() {
            let Some(&probe) = polygon.points().first() else {
                continue;
            };
            for (j, other) in self.polygons.iter().enumerate() {
                if i != j && other.contains(probe) {
                    depths[i] += 1;
                }
            }
        }
        depths
    }

    /// Normalize windings under the even-odd rule, regardless of the input
    /// orientation: boundaries at even containment depth become positive
    /// (counter-clockwise), boundaries at odd depth become negative holes.
    ///
    /// This is only correct for sets without self- or cross-intersections,
    /// which is what the wall generator produces.
    pub fn even_odd_normalize(&mut self) {
        let depths = self.depths();
        for (polygon, depth) in self.polygons.iter_mut().zip(depths) {
            let should_be_ccw = depth % 2 == 0;
            if polygon.is_ccw() != should_be_ccw {
                polygon.reverse();
            }
        }
        self.polygons.retain(|p| p.area() != 0.0);
    }

    /// Group the polygons into (outer boundary, holes) pairs by containment
    /// depth. Boundaries at even depth become outer contours; each odd-depth
    /// boundary is attached to the innermost even-depth boundary containing
    /// it. Deeper nesting levels start new groups.
    pub fn group_with_holes(&self) -> Vec<(Polygon, Vec<Polygon>)> {
        let depths = self.depths();
        let mut groups: Vec<(usize, Polygon, Vec<Polygon>)> = Vec::new();

        // Outer boundaries first, shallowest outward.
        let mut order: Vec<usize> = (0..self.polygons.len()).collect();
        order.sort_by_key(|&i| depths[i]);

        for &i in &order {
            if depths[i] % 2 == 0 {
                groups.push((i, self.polygons[i].clone(), Vec::new()));
            }
        }
        for &i in &order {
            if depths[i] % 2 != 0 {
                let Some(&probe) = self.polygons[i].points().first() else {
                    continue;
                };
                // The innermost containing outer boundary owns this hole.
                let owner = groups
                    .iter_mut()
                    .filter(|(j, _, _)| depths[*j] == depths[i] - 1)
                    .find(|(_, outer, _)| outer.contains(probe));
                if let Some((_, _, holes)) = owner {
                    holes.push(self.polygons[i].clone());
                }
            }
        }

        groups
            .into_iter()
            .map(|(_, outer, holes)| (outer, holes))
            .collect()
    }

    /// Distance from a point to the nearest boundary of the shape.
    pub fn distance_to_boundary(&self, p: Point) -> CoordF {
        self.polygons
            .iter()
            .map(|polygon| polygon.distance_to_boundary(p))
            .fold(CoordF::INFINITY, CoordF::min)
    }
}
