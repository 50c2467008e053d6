//! Variable-width wall generation.
//!
//! Given a layer's outline polygons and a target inset count, this module
//! produces a set of variable-width tool-path lines plus the residual inner
//! contour for infill.
//!
//! # Overview
//!
//! 1. The outline is prepared: morphological opening, short-segment
//!    simplification, self-intersection repair, degenerate vertex removal
//!    and small-area filtering. Skeletal beading needs a clean input.
//! 2. A beading strategy is composed from the wall settings.
//! 3. The skeletal beader emits variable-width lines.
//! 4. Zero-width contour lines are partitioned off, stitched into closed
//!    polygons and normalized into the inner contour shape.
//!
//! A degenerate outline is not an error: the generator produces less, down
//! to nothing, but never fails on geometry.

pub mod beading;
mod junction;
mod line;
mod skeletal;
mod stitch;

pub use beading::{Beading, BeadingStrategy};
pub use junction::ExtrusionJunction;
pub use line::{ExtrusionLine, VariableWidthLines, VariableWidthPaths};
pub use skeletal::SkeletalBeading;
pub use stitch::stitch_contours;

use log::debug;

use crate::clipper::{self, OffsetJoinType};
use crate::geometry::Shape;
use crate::settings::WallSettings;
use crate::{unscale, Coord, CoordF, Result};

/// Transition length as a multiple of the outer bead width.
const TRANSITION_LENGTH_MULTIPLIER: Coord = 2;

/// Segments shorter than this are simplified away before beading (µm).
const SMALLEST_SEGMENT: Coord = 50;

/// Maximum deviation allowed while simplifying (µm).
const ALLOWED_DISTANCE: Coord = 50;

/// Offset used to eliminate sub-epsilon features and near-self-intersections
/// before beading (µm).
const EPSILON_OFFSET: Coord = ALLOWED_DISTANCE / 2 - 1;

/// Angle below which bead-count transitions are spread out (radians).
const TRANSITIONING_ANGLE: CoordF = 0.5;

/// Generates variable-width wall tool paths for one outline.
pub struct WallToolPaths {
    outline: Shape,
    bead_width_0: Coord,
    bead_width_x: Coord,
    inset_count: usize,
    settings: WallSettings,
    toolpaths: VariableWidthPaths,
    inner_contour: Shape,
    toolpaths_generated: bool,
}

impl WallToolPaths {
    /// Create a generator with one nominal bead width for all walls.
    pub fn new(
        outline: Shape,
        nominal_bead_width: Coord,
        inset_count: usize,
        settings: WallSettings,
    ) -> Self {
        Self::with_widths(
            outline,
            nominal_bead_width,
            nominal_bead_width,
            inset_count,
            settings,
        )
    }

    /// Create a generator with separate outer and inner bead widths.
    pub fn with_widths(
        outline: Shape,
        bead_width_0: Coord,
        bead_width_x: Coord,
        inset_count: usize,
        settings: WallSettings,
    ) -> Self {
        Self {
            outline,
            bead_width_0,
            bead_width_x,
            inset_count,
            settings,
            toolpaths: Vec::new(),
            inner_contour: Shape::new(),
            toolpaths_generated: false,
        }
    }

    /// Generate the tool paths (idempotent).
    pub fn generate(&mut self) -> Result<&VariableWidthPaths> {
        if self.toolpaths_generated {
            return Ok(&self.toolpaths);
        }

        let prepared_outline = self.prepare_outline();

        if prepared_outline.area() > 0.0 {
            let max_bead_count = 2 * self.inset_count;
            let strategy = beading::make_strategy(
                self.settings.beading_strategy_type,
                self.bead_width_0,
                self.bead_width_x,
                TRANSITION_LENGTH_MULTIPLIER * self.bead_width_0,
                TRANSITIONING_ANGLE,
                self.settings.fill_outline_gaps,
                self.settings.min_bead_width,
                self.settings.min_feature_size,
                max_bead_count,
            )?;
            let beader = SkeletalBeading::new(strategy.as_ref(), strategy.transitioning_angle());
            self.toolpaths = beader.generate_toolpaths(&prepared_outline);
            self.compute_inner_contour();
        } else {
            debug!("outline degenerated away during preparation; no walls generated");
        }

        remove_empty_toolpaths(&mut self.toolpaths);
        self.toolpaths_generated = true;
        Ok(&self.toolpaths)
    }

    /// The generated tool paths, generating them on first use.
    pub fn tool_paths(&mut self) -> Result<&VariableWidthPaths> {
        self.generate()
    }

    /// The inner contour left for infill. With an inset count of zero the
    /// outline itself is the infill boundary.
    pub fn inner_contour(&mut self) -> Result<&Shape> {
        if self.inset_count == 0 {
            return Ok(&self.outline);
        }
        if !self.toolpaths_generated {
            self.generate()?;
        }
        Ok(&self.inner_contour)
    }

    /// Clean the outline for stable skeletal beading: no self-intersections,
    /// no degenerate or colinear segments, no features below epsilon, no
    /// areas below `(bead_width_0 / 2)²`.
    fn prepare_outline(&self) -> Shape {
        let epsilon = unscale(EPSILON_OFFSET);
        let mut prepared = clipper::opening(&self.outline, epsilon, OffsetJoinType::Miter);
        for polygon in prepared.polygons_mut() {
            polygon.simplify(SMALLEST_SEGMENT, ALLOWED_DISTANCE);
        }
        prepared = clipper::self_union(&prepared);
        for polygon in prepared.polygons_mut() {
            polygon.remove_degenerate();
        }
        prepared.polygons_mut().retain(|p| p.len() >= 3);

        let small_area_length = unscale(self.bead_width_0) / 2.0;
        let min_area_mm2 = small_area_length * small_area_length;
        prepared.remove_small_areas(min_area_mm2 * crate::SCALING_FACTOR * crate::SCALING_FACTOR);
        prepared
    }

    /// Split off the zero-width contour paths and stitch them into the inner
    /// contour shape.
    fn compute_inner_contour(&mut self) {
        let mut actual_toolpaths: VariableWidthPaths = Vec::with_capacity(self.toolpaths.len());
        let mut contour_paths: VariableWidthPaths = Vec::new();
        for path in self.toolpaths.drain(..) {
            // The first junction encountered in the group decides; a group
            // with no junctions at all counts as a tool path.
            let is_contour = path
                .iter()
                .flat_map(|line| line.junctions.first())
                .next()
                .map(|junction| junction.is_contour())
                .unwrap_or(false);
            if is_contour {
                contour_paths.push(path);
            } else {
                actual_toolpaths.push(path);
            }
        }
        self.toolpaths = actual_toolpaths;

        // The contour walls have zero width, so in theory they are closed
        // already; stitching absorbs the rounding errors that keep them from
        // being so.
        let stitch_distance = self.bead_width_0 / 2;
        let stitched = stitch_contours(&contour_paths, stitch_distance);

        // The stitched walls carry no usable winding order. Normalizing
        // under the even-odd rule makes the outside contour positive and
        // holes negative regardless of the emitted direction.
        let mut inner_contour = Shape::from_polygons(stitched);
        inner_contour.even_odd_normalize();
        self.inner_contour = inner_contour;
    }
}

/// Drop inset groups that ended up empty. Returns whether anything is left.
pub fn remove_empty_toolpaths(toolpaths: &mut VariableWidthPaths) -> bool {
    toolpaths.retain(|lines| !lines.is_empty());
    toolpaths.is_empty()
}

/// Generate wall tool paths and the inner contour in one call.
///
/// This is the public contract of the wall generator: outline in,
/// variable-width tool paths and the residual infill boundary out.
pub fn generate(
    outline: &Shape,
    bead_width_0: Coord,
    bead_width_x: Coord,
    inset_count: usize,
    settings: &WallSettings,
) -> Result<(VariableWidthPaths, Shape)> {
    let mut wall_tool_paths = WallToolPaths::with_widths(
        outline.clone(),
        bead_width_0,
        bead_width_x,
        inset_count,
        settings.clone(),
    );
    wall_tool_paths.generate()?;
    let inner_contour = wall_tool_paths.inner_contour()?.clone();
    Ok((wall_tool_paths.toolpaths, inner_contour))
}
