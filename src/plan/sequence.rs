//! Extruder moves and continuous move sequences.

use log::warn;

use super::feature::FeatureExtrusion;
use super::layer::LayerPlan;
use crate::export::PlanExporter;
use crate::geometry::Point3;
use crate::walls::ExtrusionLine;
use crate::{Coord, CoordF, Result};

/// A single extruder motion towards a position.
///
/// Positions are stored with z relative to the owning layer plan; the
/// absolute z is resolved from the layer during emission.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtruderMove {
    /// An extruding motion. The line width ratio scales the owning
    /// feature's nominal line width at this destination.
    Extrusion {
        position: Point3,
        line_width_ratio: CoordF,
    },
    /// A non-extruding motion.
    Travel { position: Point3 },
}

impl ExtruderMove {
    /// Create an extrusion move with the nominal line width.
    pub fn extrusion(position: Point3) -> Self {
        Self::Extrusion {
            position,
            line_width_ratio: 1.0,
        }
    }

    /// Create an extrusion move with a specific line width ratio.
    pub fn extrusion_with_ratio(position: Point3, line_width_ratio: CoordF) -> Self {
        Self::Extrusion {
            position,
            line_width_ratio,
        }
    }

    /// Create a travel move.
    pub fn travel(position: Point3) -> Self {
        Self::Travel { position }
    }

    /// The destination of this move (layer-relative z).
    pub fn position(&self) -> Point3 {
        match self {
            Self::Extrusion { position, .. } | Self::Travel { position } => *position,
        }
    }

    /// Move the destination.
    pub fn set_position(&mut self, new_position: Point3) {
        match self {
            Self::Extrusion { position, .. } | Self::Travel { position } => {
                *position = new_position;
            }
        }
    }

    /// True for travel moves.
    pub fn is_travel(&self) -> bool {
        matches!(self, Self::Travel { .. })
    }

    /// Emit this move through the exporter. Each leaf emits exactly one
    /// exporter call; a leaf that lacks the expected ancestry is logged and
    /// skipped rather than failing the emission.
    pub fn write(
        &self,
        exporter: &mut dyn PlanExporter,
        layer_plan: &LayerPlan,
        feature: &FeatureExtrusion,
    ) -> Result<()> {
        let relative = self.position();
        let absolute = Point3::new(relative.x, relative.y, layer_plan.z() + relative.z);
        match self {
            Self::Extrusion {
                line_width_ratio, ..
            } => {
                if feature.is_travel() {
                    warn!("skipping extrusion move: not part of an extruding feature");
                    return Ok(());
                }
                let velocity =
                    feature.speed() * feature.speed_factor() * feature.speed_back_pressure_factor();
                let line_width =
                    (feature.line_width_factor() * line_width_ratio).round() as Coord;
                let line_thickness =
                    feature.layer_thickness() + feature.z_offset() + relative.z;
                exporter.write_extrusion(
                    absolute,
                    velocity,
                    feature.extrusion_mm3_per_mm(),
                    line_width,
                    line_thickness,
                    feature.feature_type(),
                    false,
                )?;
            }
            Self::Travel { .. } => {
                exporter.write_travel(absolute, feature.speed(), feature.feature_type())?;
            }
        }
        Ok(())
    }
}

/// One unbroken chain of extruder motions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContinuousExtruderMoveSequence {
    closed: bool,
    start_position: Point3,
    moves: Vec<ExtruderMove>,
}

impl ContinuousExtruderMoveSequence {
    /// Create an empty sequence starting at the given position.
    pub fn new(closed: bool, start_position: Point3) -> Self {
        Self {
            closed,
            start_position,
            moves: Vec::new(),
        }
    }

    /// Build a sequence from a variable-width extrusion line. The junction
    /// widths become per-move line width ratios against the nominal width.
    /// Returns `None` for lines without junctions.
    pub fn from_extrusion_line(line: &ExtrusionLine, nominal_width: Coord) -> Option<Self> {
        let first = line.front()?;
        let mut sequence = Self::new(line.is_closed, first.p.with_z(0));
        for junction in line.junctions.iter().skip(1) {
            let ratio = if nominal_width > 0 {
                junction.w as CoordF / nominal_width as CoordF
            } else {
                1.0
            };
            sequence.push_move(ExtruderMove::extrusion_with_ratio(junction.p.with_z(0), ratio));
        }
        if line.is_closed && line.len() > 1 {
            let ratio = if nominal_width > 0 {
                first.w as CoordF / nominal_width as CoordF
            } else {
                1.0
            };
            sequence.push_move(ExtruderMove::extrusion_with_ratio(first.p.with_z(0), ratio));
        }
        Some(sequence)
    }

    /// Append a move.
    pub fn push_move(&mut self, extruder_move: ExtruderMove) {
        self.moves.push(extruder_move);
    }

    /// The moves of this sequence, in execution order.
    pub fn moves(&self) -> &[ExtruderMove] {
        &self.moves
    }

    /// Mutable access to the moves.
    pub fn moves_mut(&mut self) -> &mut Vec<ExtruderMove> {
        &mut self.moves
    }

    /// True if the sequence holds no moves.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Whether this sequence forms a closed chain.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The position the chain starts from (layer-relative z).
    pub fn start_position(&self) -> Point3 {
        self.start_position
    }

    /// Move the chain's starting point.
    pub fn set_start_position(&mut self, start_position: Point3) {
        self.start_position = start_position;
    }

    /// First absolute position of the chain, if any moves exist.
    pub fn find_start_position(&self) -> Option<Point3> {
        if self.moves.is_empty() {
            None
        } else {
            Some(self.start_position)
        }
    }

    /// Last position of the chain, if any moves exist.
    pub fn find_end_position(&self) -> Option<Point3> {
        self.moves.last().map(|m| m.position())
    }

    /// Emit all moves in order.
    pub fn write(
        &self,
        exporter: &mut dyn PlanExporter,
        layer_plan: &LayerPlan,
        feature: &FeatureExtrusion,
    ) -> Result<()> {
        for extruder_move in &self.moves {
            extruder_move.write(exporter, layer_plan, feature)?;
        }
        Ok(())
    }
}
