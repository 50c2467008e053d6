//! Skeletal beading: distributing bead widths over a shape's skeleton.
//!
//! The beader decomposes the prepared outline into connected regions and,
//! per region, probes the available wall thickness on the medial axis
//! (approximated through inward offsets). The beading strategy maps that
//! thickness to bead widths and centerline locations; each centerline is
//! realized as an inward offset of the region boundary. Junction widths on
//! the centermost bead are re-measured against the locally available space,
//! so beads narrow where the region does, with the width gradient capped by
//! the transitioning angle.
//!
//! Thickness left uncovered by beads (the strategy caps the bead count) is
//! emitted as zero-width contour lines delimiting the area left for infill.

use crate::clipper::{self, OffsetJoinType};
use crate::geometry::{Point, Polygon, Shape};
use crate::walls::beading::{Beading, BeadingStrategy};
use crate::walls::junction::ExtrusionJunction;
use crate::walls::line::{ExtrusionLine, VariableWidthPaths};
use crate::{unscale, Coord, CoordF};

/// Distributes variable-width beads over the skeleton of a shape.
pub struct SkeletalBeading<'a> {
    strategy: &'a dyn BeadingStrategy,
    transitioning_angle: CoordF,
}

impl<'a> SkeletalBeading<'a> {
    /// Create a beader for the given strategy. `transitioning_angle` caps
    /// the width gradient along a bead (radians).
    pub fn new(strategy: &'a dyn BeadingStrategy, transitioning_angle: CoordF) -> Self {
        Self {
            strategy,
            transitioning_angle,
        }
    }

    /// Generate variable-width toolpaths for a prepared outline.
    ///
    /// The result groups lines per inset level, outer wall first; all
    /// zero-width contour lines land in one trailing group. Regions too
    /// thin for any bead produce nothing.
    pub fn generate_toolpaths(&self, prepared: &Shape) -> VariableWidthPaths {
        let mut toolpaths: VariableWidthPaths = Vec::new();
        let mut contours: Vec<ExtrusionLine> = Vec::new();

        for (outer, holes) in prepared.group_with_holes() {
            let mut region = Shape::from_polygons(
                std::iter::once(outer).chain(holes).collect(),
            );
            region.even_odd_normalize();
            self.bead_region(&region, &mut toolpaths, &mut contours);
        }

        if !contours.is_empty() {
            toolpaths.push(contours);
        }
        toolpaths
    }

    fn bead_region(
        &self,
        region: &Shape,
        toolpaths: &mut VariableWidthPaths,
        contours: &mut Vec<ExtrusionLine>,
    ) {
        let inscribed_depth = Self::inscribed_depth(region);
        if inscribed_depth <= 0 {
            return;
        }
        let thickness = 2 * inscribed_depth;

        let bead_count = self.strategy.optimal_bead_count(thickness);
        if bead_count == 0 {
            return;
        }
        let beading = self.strategy.compute(thickness, bead_count);

        // A closed inward offset realizes a symmetric bead pair at once, so
        // only the outer half of the beading needs to be walked.
        let paired = beading.bead_widths.len();
        let half = (paired + 1) / 2;
        for inset_index in 0..half {
            let location = beading.toolpath_locations[inset_index];
            let nominal_width = beading.bead_widths[inset_index];
            let spans_skeleton =
                paired % 2 == 1 && inset_index == paired / 2 && beading.left_over == 0;

            let mut centerline = clipper::shrink(region, unscale(location), OffsetJoinType::Miter);
            if centerline.is_empty() && spans_skeleton {
                // The centermost bead rides the skeleton itself; numeric
                // wobble can make the exact offset vanish.
                centerline = clipper::shrink(
                    region,
                    unscale((inscribed_depth - 2).max(0)),
                    OffsetJoinType::Miter,
                );
            }

            for polygon in centerline.polygons() {
                let line = if spans_skeleton {
                    self.skeleton_bead(region, polygon, &beading, nominal_width, inset_index)
                } else {
                    ExtrusionLine::from_junctions(
                        polygon
                            .points()
                            .iter()
                            .map(|&p| ExtrusionJunction::new(p, nominal_width))
                            .collect(),
                        inset_index,
                        true,
                    )
                };
                if toolpaths.len() <= inset_index {
                    toolpaths.resize_with(inset_index + 1, Vec::new);
                }
                toolpaths[inset_index].push(line);
            }
        }

        // Uncovered middle → contour lines for the infill boundary.
        if beading.left_over > 0 {
            let wall_depth: Coord = beading.bead_widths.iter().sum::<Coord>() / 2;
            let residual = clipper::shrink(region, unscale(wall_depth), OffsetJoinType::Miter);
            for polygon in residual.polygons() {
                let mut line = ExtrusionLine::new(half, false);
                for &p in polygon.points() {
                    line.add(ExtrusionJunction::contour(p));
                }
                // Repeat the head so downstream stitching observes a closed
                // chain even though the line is stored as a polyline.
                if let Some(&first) = polygon.points().first() {
                    line.add(ExtrusionJunction::contour(first));
                }
                if line.len() >= 4 {
                    contours.push(line);
                }
            }
        }
    }

    /// The centermost bead follows the skeleton; its junction widths are
    /// re-measured against the locally available space.
    fn skeleton_bead(
        &self,
        region: &Shape,
        polygon: &Polygon,
        beading: &Beading,
        nominal_width: Coord,
        inset_index: usize,
    ) -> ExtrusionLine {
        let other_beads: Coord = beading.total_thickness - nominal_width;

        let mut junctions: Vec<ExtrusionJunction> = polygon
            .points()
            .iter()
            .map(|&p| {
                let radius = region.distance_to_boundary(p);
                let available = (2.0 * radius) as Coord - other_beads;
                ExtrusionJunction::new(p, available.clamp(1, nominal_width.max(1)))
            })
            .collect();
        self.limit_width_gradient(&mut junctions);

        ExtrusionLine::from_junctions(junctions, inset_index, true)
    }

    /// Cap the width change between neighbouring junctions at the rate the
    /// transitioning angle allows.
    fn limit_width_gradient(&self, junctions: &mut [ExtrusionJunction]) {
        let n = junctions.len();
        if n < 2 {
            return;
        }
        let slope = self.transitioning_angle.tan().abs();
        // Two passes around the loop settle the constraint in both
        // directions.
        for _ in 0..2 {
            for i in 0..n {
                let next = (i + 1) % n;
                let max_step =
                    (2.0 * slope * junctions[i].p.distance(&junctions[next].p)) as Coord;
                let limit = junctions[i].w + max_step;
                if junctions[next].w > limit {
                    junctions[next].w = limit.max(1);
                }
                let limit = junctions[next].w + max_step;
                if junctions[i].w > limit {
                    junctions[i].w = limit.max(1);
                }
            }
        }
    }

    /// The deepest inward offset at which the region still has area: half
    /// the thickness on the widest part of the skeleton.
    fn inscribed_depth(region: &Shape) -> Coord {
        let mut min = Point::new(Coord::MAX, Coord::MAX);
        let mut max = Point::new(Coord::MIN, Coord::MIN);
        for polygon in region.polygons() {
            for p in polygon.points() {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
            }
        }
        if min.x > max.x {
            return 0;
        }

        let mut lo: Coord = 0; // offset depth known to keep area
        let mut hi: Coord = ((max.x - min.x).min(max.y - min.y) / 2).max(1) + 1;
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            let shrunk = clipper::shrink(region, unscale(mid), OffsetJoinType::Miter);
            if shrunk.is_empty() {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo
    }
}
