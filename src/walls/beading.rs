//! Beading strategies: how bead widths are distributed across a wall.
//!
//! A beading strategy maps a locally available wall thickness to a set of
//! bead widths and centerline locations. Strategies compose: a base
//! distribution is wrapped by redistribution (nominal outer width), optional
//! widening (thin-wall printing) and a bead-count limiter, in that order.
//! [`make_strategy`] builds the composed chain from a strategy type and the
//! wall parameters.

use crate::settings::BeadingStrategyType;
use crate::{Coord, CoordF, Error, Result};

/// The computed beading for one local thickness: how many beads, how wide
/// each is, and where their centerlines sit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Beading {
    /// The thickness this beading was computed for (µm).
    pub total_thickness: Coord,

    /// Width of each bead (µm), ordered from one boundary to the other.
    pub bead_widths: Vec<Coord>,

    /// Centerline location of each bead, measured from the boundary (µm).
    pub toolpath_locations: Vec<Coord>,

    /// Thickness not covered by any bead (µm). Non-zero when the bead count
    /// is capped; the uncovered middle becomes the inner contour.
    pub left_over: Coord,
}

impl Beading {
    fn empty(thickness: Coord) -> Self {
        Self {
            total_thickness: thickness,
            bead_widths: Vec::new(),
            toolpath_locations: Vec::new(),
            left_over: thickness,
        }
    }
}

/// A bead-width distribution scheme.
///
/// Strategies are read-only after construction and may be shared between
/// worker threads.
pub trait BeadingStrategy: Send + Sync {
    /// Distribute `bead_count` beads over a wall of the given thickness.
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading;

    /// The thickness at which `bead_count` beads print at their best widths.
    fn optimal_thickness(&self, bead_count: usize) -> Coord;

    /// The thickness above which `lower_bead_count + 1` beads are preferred
    /// over `lower_bead_count`.
    fn transition_thickness(&self, lower_bead_count: usize) -> Coord;

    /// The preferred bead count for the given thickness.
    fn optimal_bead_count(&self, thickness: Coord) -> usize;

    /// Angle below which transitions in bead count are spread out (radians).
    fn transitioning_angle(&self) -> CoordF;

    /// Length over which a transition between bead counts is spread (µm).
    fn transition_length(&self) -> Coord;

    /// Human-readable strategy name, for diagnostics.
    fn name(&self) -> String;
}

/// Evenly distributes the width deviation over all beads.
pub struct DistributedBeadingStrategy {
    optimal_width: Coord,
    transition_length: Coord,
    transitioning_angle: CoordF,
}

impl DistributedBeadingStrategy {
    pub fn new(optimal_width: Coord, transition_length: Coord, transitioning_angle: CoordF) -> Self {
        Self {
            optimal_width,
            transition_length,
            transitioning_angle,
        }
    }
}

impl BeadingStrategy for DistributedBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 || thickness <= 0 {
            return Beading::empty(thickness.max(0));
        }

        // Bead edges at evenly divided positions; widths absorb rounding.
        let n = bead_count as Coord;
        let mut bead_widths = Vec::with_capacity(bead_count);
        let mut toolpath_locations = Vec::with_capacity(bead_count);
        for j in 0..bead_count as Coord {
            let lower = j * thickness / n;
            let upper = (j + 1) * thickness / n;
            bead_widths.push(upper - lower);
            toolpath_locations.push((lower + upper) / 2);
        }

        Beading {
            total_thickness: thickness,
            bead_widths,
            toolpath_locations,
            left_over: 0,
        }
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        bead_count as Coord * self.optimal_width
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.optimal_thickness(lower_bead_count) + self.optimal_width / 2
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness <= 0 {
            return 0;
        }
        ((2 * thickness + self.optimal_width) / (2 * self.optimal_width)) as usize
    }

    fn transitioning_angle(&self) -> CoordF {
        self.transitioning_angle
    }

    fn transition_length(&self) -> Coord {
        self.transition_length
    }

    fn name(&self) -> String {
        "Distributed".into()
    }
}

/// Keeps all beads at their optimal width and puts the entire deviation in
/// the centermost bead (or pair of beads).
pub struct CenterDeviationBeadingStrategy {
    optimal_width: Coord,
    transition_length: Coord,
    transitioning_angle: CoordF,
}

impl CenterDeviationBeadingStrategy {
    pub fn new(optimal_width: Coord, transition_length: Coord, transitioning_angle: CoordF) -> Self {
        Self {
            optimal_width,
            transition_length,
            transitioning_angle,
        }
    }
}

impl BeadingStrategy for CenterDeviationBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 || thickness <= 0 {
            return Beading::empty(thickness.max(0));
        }

        let deviation = thickness - bead_count as Coord * self.optimal_width;
        let mut bead_widths = vec![self.optimal_width; bead_count];
        if bead_count % 2 == 1 {
            let mid = bead_count / 2;
            bead_widths[mid] = (bead_widths[mid] + deviation).max(1);
        } else {
            let mid = bead_count / 2;
            bead_widths[mid - 1] = (bead_widths[mid - 1] + deviation / 2).max(1);
            bead_widths[mid] = (bead_widths[mid] + deviation - deviation / 2).max(1);
        }

        let mut toolpath_locations = Vec::with_capacity(bead_count);
        let mut edge = 0;
        for &width in &bead_widths {
            toolpath_locations.push(edge + width / 2);
            edge += width;
        }

        Beading {
            total_thickness: thickness,
            bead_widths,
            toolpath_locations,
            left_over: (thickness - edge).max(0),
        }
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        bead_count as Coord * self.optimal_width
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.optimal_thickness(lower_bead_count) + self.optimal_width / 2
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness <= 0 {
            return 0;
        }
        ((2 * thickness + self.optimal_width) / (2 * self.optimal_width)) as usize
    }

    fn transitioning_angle(&self) -> CoordF {
        self.transitioning_angle
    }

    fn transition_length(&self) -> Coord {
        self.transition_length
    }

    fn name(&self) -> String {
        "CenterDeviation".into()
    }
}

/// Distributes the width deviation over the beads with inner beads taking
/// more of it, keeping the outer beads close to their optimal width.
pub struct InwardDistributedBeadingStrategy {
    optimal_width: Coord,
    transition_length: Coord,
    transitioning_angle: CoordF,
}

impl InwardDistributedBeadingStrategy {
    pub fn new(optimal_width: Coord, transition_length: Coord, transitioning_angle: CoordF) -> Self {
        Self {
            optimal_width,
            transition_length,
            transitioning_angle,
        }
    }
}

impl BeadingStrategy for InwardDistributedBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 || thickness <= 0 {
            return Beading::empty(thickness.max(0));
        }

        let deviation = (thickness - bead_count as Coord * self.optimal_width) as CoordF;
        let middle = (bead_count as CoordF - 1.0) / 2.0;
        let weights: Vec<CoordF> = (0..bead_count)
            .map(|j| 1.0 / (1.0 + (j as CoordF - middle).abs()))
            .collect();
        let weight_sum: CoordF = weights.iter().sum();

        let mut bead_widths: Vec<Coord> = weights
            .iter()
            .map(|w| (self.optimal_width as CoordF + deviation * w / weight_sum).round() as Coord)
            .map(|w| w.max(1))
            .collect();

        // Absorb the rounding residual in the centermost bead so the beads
        // cover the thickness exactly.
        let covered: Coord = bead_widths.iter().sum();
        let mid = bead_count / 2;
        bead_widths[mid] = (bead_widths[mid] + thickness - covered).max(1);

        let mut toolpath_locations = Vec::with_capacity(bead_count);
        let mut edge = 0;
        for &width in &bead_widths {
            toolpath_locations.push(edge + width / 2);
            edge += width;
        }

        Beading {
            total_thickness: thickness,
            bead_widths,
            toolpath_locations,
            left_over: (thickness - edge).max(0),
        }
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        bead_count as Coord * self.optimal_width
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.optimal_thickness(lower_bead_count) + self.optimal_width / 2
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness <= 0 {
            return 0;
        }
        ((2 * thickness + self.optimal_width) / (2 * self.optimal_width)) as usize
    }

    fn transitioning_angle(&self) -> CoordF {
        self.transitioning_angle
    }

    fn transition_length(&self) -> Coord {
        self.transition_length
    }

    fn name(&self) -> String {
        "InwardDistributed".into()
    }
}

/// Forces the outermost bead on each side to the nominal outer-wall width
/// and delegates the remaining thickness to the wrapped strategy.
pub struct RedistributeBeadingStrategy {
    parent: Box<dyn BeadingStrategy>,
    optimal_width_outer: Coord,
}

impl RedistributeBeadingStrategy {
    pub fn new(parent: Box<dyn BeadingStrategy>, optimal_width_outer: Coord) -> Self {
        Self {
            parent,
            optimal_width_outer,
        }
    }
}

impl BeadingStrategy for RedistributeBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 || thickness <= 0 {
            return Beading::empty(thickness.max(0));
        }

        if bead_count == 1 {
            // A lone bead takes all the thickness there is.
            return Beading {
                total_thickness: thickness,
                bead_widths: vec![thickness],
                toolpath_locations: vec![thickness / 2],
                left_over: 0,
            };
        }

        if bead_count == 2 {
            // No inner bead to absorb the deviation; the outer pair splits
            // the thickness between them.
            let first = thickness / 2;
            return Beading {
                total_thickness: thickness,
                bead_widths: vec![first, thickness - first],
                toolpath_locations: vec![first / 2, thickness - (thickness - first) / 2],
                left_over: 0,
            };
        }

        // Both outermost beads at the nominal outer width; if the wall is
        // too thin for that, they split the thickness.
        let outer = self.optimal_width_outer.min(thickness / 2);
        let inner = self.parent.compute(thickness - 2 * outer, bead_count - 2);

        let mut bead_widths = Vec::with_capacity(bead_count);
        let mut toolpath_locations = Vec::with_capacity(bead_count);
        bead_widths.push(outer);
        toolpath_locations.push(outer / 2);
        for (&width, &location) in inner.bead_widths.iter().zip(&inner.toolpath_locations) {
            bead_widths.push(width);
            toolpath_locations.push(outer + location);
        }
        bead_widths.push(outer);
        toolpath_locations.push(thickness - outer / 2);

        Beading {
            total_thickness: thickness,
            bead_widths,
            toolpath_locations,
            left_over: inner.left_over,
        }
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        match bead_count {
            0 => 0,
            1 => self.optimal_width_outer,
            n => 2 * self.optimal_width_outer + self.parent.optimal_thickness(n - 2),
        }
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        match lower_bead_count {
            0 => self.optimal_width_outer / 2,
            1 => self.optimal_width_outer * 3 / 2,
            n => 2 * self.optimal_width_outer + self.parent.transition_thickness(n - 2),
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness < self.transition_thickness(0) {
            0
        } else if thickness < self.transition_thickness(1) {
            1
        } else if thickness < self.transition_thickness(2) {
            2
        } else {
            2 + self
                .parent
                .optimal_bead_count(thickness - 2 * self.optimal_width_outer)
        }
    }

    fn transitioning_angle(&self) -> CoordF {
        self.parent.transitioning_angle()
    }

    fn transition_length(&self) -> Coord {
        self.parent.transition_length()
    }

    fn name(&self) -> String {
        format!("Redistribute({})", self.parent.name())
    }
}

/// Prints regions thinner than a single bead with one widened bead, so thin
/// walls do not fall out of the print entirely.
pub struct WideningBeadingStrategy {
    parent: Box<dyn BeadingStrategy>,
    min_input_width: Coord,
    min_output_width: Coord,
}

impl WideningBeadingStrategy {
    pub fn new(
        parent: Box<dyn BeadingStrategy>,
        min_input_width: Coord,
        min_output_width: Coord,
    ) -> Self {
        Self {
            parent,
            min_input_width,
            min_output_width,
        }
    }
}

impl BeadingStrategy for WideningBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if thickness > 0 && bead_count <= 1 && thickness >= self.min_input_width {
            let width = thickness.max(self.min_output_width);
            return Beading {
                total_thickness: thickness,
                bead_widths: vec![width],
                toolpath_locations: vec![thickness / 2],
                left_over: 0,
            };
        }
        self.parent.compute(thickness, bead_count)
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        if lower_bead_count == 0 {
            self.min_input_width
        } else {
            self.parent.transition_thickness(lower_bead_count)
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        let count = self.parent.optimal_bead_count(thickness);
        if count == 0 && thickness >= self.min_input_width {
            1
        } else {
            count
        }
    }

    fn transitioning_angle(&self) -> CoordF {
        self.parent.transitioning_angle()
    }

    fn transition_length(&self) -> Coord {
        self.parent.transition_length()
    }

    fn name(&self) -> String {
        format!("Widening({})", self.parent.name())
    }
}

/// Caps the bead count; thickness beyond the capped beads is reported as
/// left-over and becomes the inner contour.
pub struct LimitedBeadingStrategy {
    parent: Box<dyn BeadingStrategy>,
    max_bead_count: usize,
}

impl LimitedBeadingStrategy {
    pub fn new(parent: Box<dyn BeadingStrategy>, max_bead_count: usize) -> Self {
        Self {
            parent,
            max_bead_count,
        }
    }
}

impl BeadingStrategy for LimitedBeadingStrategy {
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let bead_count = bead_count.min(self.max_bead_count);
        if bead_count == 0 {
            return Beading::empty(thickness.max(0));
        }

        let optimal = self.parent.optimal_thickness(bead_count);
        if thickness <= optimal {
            return self.parent.compute(thickness, bead_count);
        }

        // Thicker than the capped beads cover: print them at their optimal
        // widths and leave the middle open.
        let mut beading = self.parent.compute(optimal, bead_count);
        beading.total_thickness = thickness;
        beading.left_over += thickness - optimal;
        beading
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count.min(self.max_bead_count))
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        if lower_bead_count >= self.max_bead_count {
            Coord::MAX
        } else {
            self.parent.transition_thickness(lower_bead_count)
        }
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        self.parent.optimal_bead_count(thickness).min(self.max_bead_count)
    }

    fn transitioning_angle(&self) -> CoordF {
        self.parent.transitioning_angle()
    }

    fn transition_length(&self) -> Coord {
        self.parent.transition_length()
    }

    fn name(&self) -> String {
        format!("Limited({})", self.parent.name())
    }
}

/// Build the composed strategy chain for the given strategy type and wall
/// parameters: base distribution → redistribution (outer width) →
/// optional widening (thin walls) → bead-count limiter.
#[allow(clippy::too_many_arguments)]
pub fn make_strategy(
    strategy_type: BeadingStrategyType,
    bead_width_0: Coord,
    bead_width_x: Coord,
    transition_length: Coord,
    transitioning_angle: CoordF,
    print_thin_walls: bool,
    min_bead_width: Coord,
    min_feature_size: Coord,
    max_bead_count: usize,
) -> Result<Box<dyn BeadingStrategy>> {
    if bead_width_0 <= 0 || bead_width_x <= 0 {
        return Err(Error::StrategyUnavailable(format!(
            "non-positive bead width ({bead_width_0}, {bead_width_x})"
        )));
    }
    if print_thin_walls && (min_bead_width <= 0 || min_feature_size <= 0) {
        return Err(Error::StrategyUnavailable(format!(
            "thin wall printing requires positive widths ({min_feature_size}, {min_bead_width})"
        )));
    }

    let base: Box<dyn BeadingStrategy> = match strategy_type {
        BeadingStrategyType::Distributed => Box::new(DistributedBeadingStrategy::new(
            bead_width_x,
            transition_length,
            transitioning_angle,
        )),
        BeadingStrategyType::CenterDeviation => Box::new(CenterDeviationBeadingStrategy::new(
            bead_width_x,
            transition_length,
            transitioning_angle,
        )),
        BeadingStrategyType::InwardDistributed => Box::new(InwardDistributedBeadingStrategy::new(
            bead_width_x,
            transition_length,
            transitioning_angle,
        )),
    };

    let mut strategy: Box<dyn BeadingStrategy> =
        Box::new(RedistributeBeadingStrategy::new(base, bead_width_0));
    if print_thin_walls {
        strategy = Box::new(WideningBeadingStrategy::new(
            strategy,
            min_feature_size,
            min_bead_width,
        ));
    }
    Ok(Box::new(LimitedBeadingStrategy::new(strategy, max_bead_count)))
}
