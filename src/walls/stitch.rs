//! Stitching open contour polylines into closed polygons.
//!
//! The beader emits zero-width contour paths which should theoretically be
//! closed, but endpoint rounding can leave small gaps. The stitcher chains
//! polylines whose endpoints lie within a tolerance of each other into
//! closed polygons.

use crate::geometry::{Polygon, SparsePointGrid};
use crate::walls::line::{ExtrusionLine, VariableWidthPaths};
use crate::Coord;

/// Join contour polylines into closed polygons, tolerating endpoint gaps up
/// to `stitch_distance` (µm).
///
/// Lines are visited in input order; every junction of the input appears in
/// exactly one output polygon. Among candidates at equal distance, the one
/// earliest in input order wins, so the result is deterministic with
/// respect to the input.
pub fn stitch_contours(input: &VariableWidthPaths, stitch_distance: Coord) -> Vec<Polygon> {
    let lines: Vec<&ExtrusionLine> = input
        .iter()
        .flat_map(|path| path.iter())
        .filter(|line| !line.is_empty())
        .collect();

    // Bucket grids over the line endpoints so nearby candidates are found
    // without scanning every line.
    let mut line_starts = SparsePointGrid::new(stitch_distance);
    let mut line_ends = SparsePointGrid::new(stitch_distance);
    for (index, line) in lines.iter().enumerate() {
        if let (Some(front), Some(back)) = (line.front(), line.back()) {
            line_starts.insert(front.p, index);
            line_ends.insert(back.p, index);
        }
    }

    let mut processed = vec![false; lines.len()];
    let mut output = Vec::new();

    for seed in 0..lines.len() {
        if processed[seed] {
            continue;
        }

        let mut polygon = Polygon::new();
        let mut nearest = Some((seed, false));
        while let Some((index, reverse)) = nearest {
            if processed[index] {
                break; // Looping; this contour is closed.
            }

            if reverse {
                for junction in lines[index].junctions.iter().rev() {
                    polygon.push(junction.p);
                }
            } else {
                for junction in &lines[index].junctions {
                    polygon.push(junction.p);
                }
            }
            processed[index] = true;

            // Attach the closest unprocessed line whose start or end lies
            // within reach; a matching end means the line is traversed in
            // reverse.
            let Some(&current_position) = polygon.points().last() else {
                break;
            };
            let mut candidates: Vec<(i128, usize, bool)> = Vec::new();
            for (p, candidate) in line_starts.nearby(current_position, stitch_distance) {
                if !processed[candidate] {
                    candidates.push((current_position.distance_squared(&p), candidate, false));
                }
            }
            for (p, candidate) in line_ends.nearby(current_position, stitch_distance) {
                if !processed[candidate] {
                    candidates.push((current_position.distance_squared(&p), candidate, true));
                }
            }
            nearest = candidates
                .into_iter()
                .min_by_key(|&(dist2, index, reverse)| (dist2, index, reverse))
                .map(|(_, index, reverse)| (index, reverse));
        }

        // Points where the loop closes collapse into the implicit closure.
        dedup_closure(&mut polygon);
        if !polygon.is_empty() {
            output.push(polygon);
        }
    }

    output
}

/// Remove adjacent duplicate points and the explicit closing point; the
/// polygon type closes implicitly.
fn dedup_closure(polygon: &mut Polygon) {
    let points = polygon.points_mut();
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
}
