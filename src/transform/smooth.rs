//! Path smoothing.
//!
//! Walks a sliding window of four consecutive vertices `(A, B, C, D)` over a
//! path. Where the middle segment is shorter than the resolution and the
//! corner is not fluid, the bounding vertices are shifted towards their
//! outer neighbours — or removed outright when their segments are too short
//! to shift along. Removal marks are applied after the full pass.

use crate::geometry::Point;
use crate::plan::{ContinuousExtruderMoveSequence, ExtruderMove};
use crate::settings::SmoothSettings;
use crate::walls::ExtrusionJunction;
use crate::{Coord, CoordF};

use super::PlanTransformer;

/// A vertex the smoothing pass can read and nudge.
pub trait SmoothablePoint {
    /// The 2D coordinates of this vertex (µm).
    fn coordinates(&self) -> (Coord, Coord);

    /// Move this vertex towards `target` by the given fraction of the
    /// distance between them.
    fn shift_towards(&mut self, target: (Coord, Coord), fraction: CoordF);
}

impl SmoothablePoint for Point {
    fn coordinates(&self) -> (Coord, Coord) {
        (self.x, self.y)
    }

    fn shift_towards(&mut self, target: (Coord, Coord), fraction: CoordF) {
        self.x += ((target.0 - self.x) as CoordF * fraction) as Coord;
        self.y += ((target.1 - self.y) as CoordF * fraction) as Coord;
    }
}

impl SmoothablePoint for ExtruderMove {
    fn coordinates(&self) -> (Coord, Coord) {
        let p = self.position();
        (p.x, p.y)
    }

    fn shift_towards(&mut self, target: (Coord, Coord), fraction: CoordF) {
        let mut p = self.position();
        p.x += ((target.0 - p.x) as CoordF * fraction) as Coord;
        p.y += ((target.1 - p.y) as CoordF * fraction) as Coord;
        self.set_position(p);
    }
}

impl SmoothablePoint for ExtrusionJunction {
    fn coordinates(&self) -> (Coord, Coord) {
        (self.p.x, self.p.y)
    }

    fn shift_towards(&mut self, target: (Coord, Coord), fraction: CoordF) {
        self.p.x += ((target.0 - self.p.x) as CoordF * fraction) as Coord;
        self.p.y += ((target.1 - self.p.y) as CoordF * fraction) as Coord;
    }
}

fn magnitude(a: (Coord, Coord), b: (Coord, Coord)) -> CoordF {
    ((b.0 - a.0) as CoordF).hypot((b.1 - a.1) as CoordF)
}

/// The angle at `b` between the segments `ab` and the segment from `b`
/// towards `target`, in radians.
fn angle_at(
    a: (Coord, Coord),
    b: (Coord, Coord),
    target: (Coord, Coord),
    ab_magnitude: CoordF,
) -> CoordF {
    let bt_magnitude = magnitude(b, target);
    if ab_magnitude == 0.0 || bt_magnitude == 0.0 {
        return std::f64::consts::FRAC_PI_2;
    }
    let ab = ((b.0 - a.0) as CoordF, (b.1 - a.1) as CoordF);
    let bt = ((target.0 - b.0) as CoordF, (target.1 - b.1) as CoordF);
    let cos = (ab.0 * bt.0 + ab.1 * bt.1) / (ab_magnitude * bt_magnitude);
    cos.clamp(-1.0, 1.0).acos()
}

/// Smooth a path in place. `closed` paths wrap the window around; open
/// paths are handled symmetrically without wraparound, and their end
/// vertices are never touched.
///
/// The number of vertices never grows, and no vertex moves further than the
/// smoothing resolution.
pub fn smooth<P: SmoothablePoint>(points: &mut Vec<P>, closed: bool, settings: &SmoothSettings) {
    let n = points.len();
    if n < 4 {
        return;
    }

    let max_resolution = settings.max_resolution as CoordF;
    // The allowed deviation from the original path, and the distance over
    // which a kept vertex is shifted.
    let allowed_deviation = max_resolution * 2.0 / 3.0;
    let smooth_distance = max_resolution / 2.0;
    let path_size = if closed { n - 1 } else { n };

    let mut removed = vec![false; n];
    let mut removed_count = 0usize;

    let mut window = 0usize;
    loop {
        let alive: Vec<usize> = (0..n).filter(|&index| !removed[index]).collect();
        let m = alive.len();
        if m < 4 {
            break;
        }
        let window_limit = if closed { n } else { m - 3 };
        if window >= window_limit {
            break;
        }

        let (ia, ib, ic, id) = if closed {
            (
                alive[window % m],
                alive[(window + 1) % m],
                alive[(window + 2) % m],
                alive[(window + 3) % m],
            )
        } else {
            (alive[window], alive[window + 1], alive[window + 2], alive[window + 3])
        };
        window += 1;

        let a = points[ia].coordinates();
        let b = points[ib].coordinates();
        let c = points[ic].coordinates();
        let d = points[id].coordinates();

        let ab_magnitude = magnitude(a, b);
        let bc_magnitude = magnitude(b, c);
        let cd_magnitude = magnitude(c, d);

        if bc_magnitude > max_resolution {
            continue;
        }
        let deviation = (angle_at(a, b, c, ab_magnitude) - angle_at(a, b, d, ab_magnitude)).abs();
        if deviation < settings.fluid_angle {
            continue;
        }

        if ab_magnitude > allowed_deviation {
            points[ib].shift_towards(a, smooth_distance / ab_magnitude);
        } else if path_size - removed_count > 2 && !removed[ib] {
            removed[ib] = true;
            removed_count += 1;
        }
        if cd_magnitude > allowed_deviation {
            points[ic].shift_towards(d, smooth_distance / cd_magnitude);
        } else if path_size - removed_count > 2 && !removed[ic] {
            removed[ic] = true;
            removed_count += 1;
        }
    }

    let mut keep = removed.iter().map(|&was_removed| !was_removed);
    points.retain(|_| keep.next().unwrap_or(true));
}

/// Smooths every move sequence of a plan.
pub struct PathSmoother {
    settings: SmoothSettings,
}

impl PathSmoother {
    pub fn new(settings: SmoothSettings) -> Self {
        Self { settings }
    }
}

impl PlanTransformer for PathSmoother {
    fn process_sequence(&mut self, sequence: &mut ContinuousExtruderMoveSequence) {
        if sequence.is_closed() {
            // The destinations of a closed chain are exactly its vertices:
            // the closing move ends on the start.
            smooth(sequence.moves_mut(), true, &self.settings);
            if let Some(end) = sequence.moves().last().map(|m| m.position()) {
                sequence.set_start_position(end);
            }
        } else {
            // Lift the start into the vertex list; the window never touches
            // the path's end vertices, so it survives unchanged.
            let start = sequence.start_position();
            let mut vertices = Vec::with_capacity(sequence.moves().len() + 1);
            vertices.push(ExtruderMove::travel(start));
            vertices.append(sequence.moves_mut());
            smooth(&mut vertices, false, &self.settings);
            vertices.remove(0);
            *sequence.moves_mut() = vertices;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(max_resolution: Coord, fluid_angle: CoordF) -> SmoothSettings {
        SmoothSettings {
            max_resolution,
            fluid_angle,
        }
    }

    #[test]
    fn test_short_bump_collapses() {
        // A closed path with a three-point bump in a long edge; the bump's
        // middle vertex disappears.
        let mut points = vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(1010, 5),
            Point::new(1020, 0),
            Point::new(2000, 0),
        ];
        smooth(&mut points, true, &settings(50, 0.2));
        assert_eq!(points.len(), 4);
        assert!(!points.iter().any(|p| p.y == 5));
    }

    #[test]
    fn test_fluid_corner_untouched() {
        // A gentle corner with short segments but an angle difference below
        // the fluid angle stays as it is.
        let mut points = vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(1040, 1),
            Point::new(1080, 2),
            Point::new(2000, 40),
        ];
        let before = points.clone();
        smooth(&mut points, true, &settings(50, 0.5));
        assert_eq!(points, before);
    }

    #[test]
    fn test_never_more_points_than_input() {
        let mut points: Vec<Point> = (0..40)
            .map(|i| Point::new(i * 30, if i % 2 == 0 { 0 } else { 10 }))
            .collect();
        let before = points.len();
        smooth(&mut points, true, &settings(50, 0.1));
        assert!(points.len() <= before);
        assert!(points.len() >= 3);
    }

    #[test]
    fn test_open_path_endpoints_survive() {
        let mut points = vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(1010, 5),
            Point::new(1020, 0),
            Point::new(2000, 0),
        ];
        smooth(&mut points, false, &settings(50, 0.2));
        assert_eq!(points.first(), Some(&Point::new(0, 0)));
        assert_eq!(points.last(), Some(&Point::new(2000, 0)));
    }

    #[test]
    fn test_small_paths_untouched() {
        let mut points = vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10)];
        let before = points.clone();
        smooth(&mut points, true, &settings(50, 0.2));
        assert_eq!(points, before);
    }

    #[test]
    fn test_smoother_keeps_closed_sequence_consistent() {
        use crate::geometry::Point3;
        use crate::transform::apply;
        use crate::plan::{
            ExtruderPlan, FeatureExtrusion, LayerPlan, PathConfig, PrintFeatureType,
        };
        use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};

        let mut sequence = ContinuousExtruderMoveSequence::new(true, Point3::new(0, 0, 0));
        for (x, y) in [(1000, 0), (1010, 5), (1020, 0), (2000, 0), (2000, 2000), (0, 2000), (0, 0)]
        {
            sequence.push_move(ExtruderMove::extrusion(Point3::new(x, y, 0)));
        }
        let config = PathConfig::new(PrintFeatureType::OuterWall, 400, 200, 30.0);
        let mut feature = FeatureExtrusion::wall(config, None, 0);
        feature.append_sequence(sequence, true);
        let mut plan = ExtruderPlan::new(
            0,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        );
        plan.append_feature(feature, true);
        let mut layer = LayerPlan::new(0, 200, 200);
        layer.append_extruder_plan(plan, true);

        let mut smoother = PathSmoother::new(settings(50, 0.2));
        apply(&mut layer, &mut smoother);

        let sequence = &layer.extruder_plans()[0].features()[0].sequences()[0];
        // The bump vertex is gone and the chain still closes on its start.
        assert!(sequence.moves().len() < 7);
        assert_eq!(
            sequence.find_end_position(),
            Some(sequence.start_position())
        );
    }
}
