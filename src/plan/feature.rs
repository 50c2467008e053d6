//! Feature extrusions: groups of move sequences sharing extrusion
//! parameters.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::layer::LayerPlan;
use super::sequence::ContinuousExtruderMoveSequence;
use super::{find_in_children, OperationRef, SearchDepth, SearchOrder};
use crate::export::PlanExporter;
use crate::geometry::Point3;
use crate::settings::SpeedDerivatives;
use crate::{Coord, CoordF, Result};

/// The kind of line being printed, as reported to exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintFeatureType {
    OuterWall,
    InnerWall,
    Skin,
    Infill,
    Support,
    SupportInterface,
    SkirtBrim,
    /// Travel without retraction.
    MoveCombing,
    /// Travel with retraction.
    MoveRetraction,
}

impl PrintFeatureType {
    /// Human-readable feature name, for traces.
    pub fn name(&self) -> &'static str {
        match self {
            PrintFeatureType::OuterWall => "outer wall",
            PrintFeatureType::InnerWall => "inner wall",
            PrintFeatureType::Skin => "skin",
            PrintFeatureType::Infill => "infill",
            PrintFeatureType::Support => "support",
            PrintFeatureType::SupportInterface => "support interface",
            PrintFeatureType::SkirtBrim => "skirt/brim",
            PrintFeatureType::MoveCombing => "travel",
            PrintFeatureType::MoveRetraction => "travel (retracted)",
        }
    }

    /// True for the travel feature types.
    pub fn is_travel(&self) -> bool {
        matches!(
            self,
            PrintFeatureType::MoveCombing | PrintFeatureType::MoveRetraction
        )
    }
}

/// Shared extrusion parameters for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathConfig {
    /// What kind of line this config prints.
    pub feature_type: PrintFeatureType,

    /// Nominal line width (µm).
    pub line_width: Coord,

    /// Layer thickness (µm).
    pub layer_thickness: Coord,

    /// Flow ratio applied on top of the feature flow.
    pub flow_ratio: CoordF,

    /// Nominal speed (mm/s).
    pub speed: CoordF,

    /// Vertical offset applied to emitted line thickness (µm).
    pub z_offset: Coord,

    /// Material per distance (mm³/mm).
    pub extrusion_mm3_per_mm: CoordF,

    /// Bridges keep their nominal speed under compensation passes.
    pub is_bridge: bool,
}

impl PathConfig {
    /// Create a config for an extruding feature.
    pub fn new(
        feature_type: PrintFeatureType,
        line_width: Coord,
        layer_thickness: Coord,
        speed: CoordF,
    ) -> Self {
        Self {
            feature_type,
            line_width,
            layer_thickness,
            flow_ratio: 1.0,
            speed,
            z_offset: 0,
            extrusion_mm3_per_mm: 0.0,
            is_bridge: false,
        }
    }

    /// Create a config for a travel feature.
    pub fn travel(feature_type: PrintFeatureType, speed: &SpeedDerivatives) -> Self {
        Self {
            feature_type,
            line_width: 0,
            layer_thickness: 0,
            flow_ratio: 0.0,
            speed: speed.speed,
            z_offset: 0,
            extrusion_mm3_per_mm: 0.0,
            is_bridge: false,
        }
    }

    /// Builder: set the flow ratio.
    pub fn with_flow_ratio(mut self, flow_ratio: CoordF) -> Self {
        self.flow_ratio = flow_ratio;
        self
    }

    /// Builder: set the extrusion volume per distance.
    pub fn with_extrusion_mm3_per_mm(mut self, mm3_per_mm: CoordF) -> Self {
        self.extrusion_mm3_per_mm = mm3_per_mm;
        self
    }

    /// Builder: mark as bridge.
    pub fn with_bridge(mut self, is_bridge: bool) -> Self {
        self.is_bridge = is_bridge;
        self
    }

    /// Builder: set the z offset.
    pub fn with_z_offset(mut self, z_offset: Coord) -> Self {
        self.z_offset = z_offset;
        self
    }
}

/// An opaque reference to the mesh a feature was generated from. Mesh
/// slicing lives outside the planner; the handle only identifies the
/// source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    pub name: String,
}

impl MeshHandle {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { name: name.into() })
    }
}

/// What a feature extrusion prints.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// A wall at the given inset, counted from the outer boundary inward.
    Wall {
        mesh: Option<Arc<MeshHandle>>,
        inset_index: usize,
    },
    /// A top/bottom surface.
    Skin { mesh: Option<Arc<MeshHandle>> },
    /// Sparse or solid interior fill.
    Infill { mesh: Option<Arc<MeshHandle>> },
    /// Support structure.
    Support,
    /// A travel route connecting two extruding features.
    Travel,
}

/// A group of continuous move sequences printed with shared parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureExtrusion {
    config: PathConfig,
    kind: FeatureKind,
    flow: CoordF,
    width_factor: CoordF,
    speed_factor: CoordF,
    speed_back_pressure_factor: CoordF,
    sequences: Vec<ContinuousExtruderMoveSequence>,
}

impl FeatureExtrusion {
    /// Create a feature extrusion.
    pub fn new(config: PathConfig, kind: FeatureKind) -> Self {
        Self {
            config,
            kind,
            flow: 1.0,
            width_factor: 1.0,
            speed_factor: 1.0,
            speed_back_pressure_factor: 1.0,
            sequences: Vec::new(),
        }
    }

    /// Create a wall feature for the given inset.
    pub fn wall(config: PathConfig, mesh: Option<Arc<MeshHandle>>, inset_index: usize) -> Self {
        Self::new(config, FeatureKind::Wall { mesh, inset_index })
    }

    /// Create a travel route: a travel-only feature with the given feature
    /// type and speed.
    pub fn travel_route(feature_type: PrintFeatureType, speed: &SpeedDerivatives) -> Self {
        Self::new(PathConfig::travel(feature_type, speed), FeatureKind::Travel)
    }

    /// Append a move sequence. With `check_non_empty`, empty sequences are
    /// silently dropped.
    pub fn append_sequence(
        &mut self,
        sequence: ContinuousExtruderMoveSequence,
        check_non_empty: bool,
    ) {
        if !check_non_empty || !sequence.is_empty() {
            self.sequences.push(sequence);
        }
    }

    /// The owned move sequences, in print order.
    pub fn sequences(&self) -> &[ContinuousExtruderMoveSequence] {
        &self.sequences
    }

    /// Mutable access to the move sequences.
    pub fn sequences_mut(&mut self) -> &mut Vec<ContinuousExtruderMoveSequence> {
        &mut self.sequences
    }

    /// True if the feature holds no sequences.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// The shared path config.
    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// What this feature prints.
    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    /// The feature type reported to exporters.
    pub fn feature_type(&self) -> PrintFeatureType {
        self.config.feature_type
    }

    /// True for travel routes.
    pub fn is_travel(&self) -> bool {
        matches!(self.kind, FeatureKind::Travel)
    }

    /// True for bridge features.
    pub fn is_bridge(&self) -> bool {
        self.config.is_bridge
    }

    /// Nominal speed (mm/s).
    pub fn speed(&self) -> CoordF {
        self.config.speed
    }

    /// The wall inset index, if this is a wall feature.
    pub fn inset_index(&self) -> Option<usize> {
        match &self.kind {
            FeatureKind::Wall { inset_index, .. } => Some(*inset_index),
            _ => None,
        }
    }

    /// The source mesh, if any.
    pub fn mesh(&self) -> Option<&Arc<MeshHandle>> {
        match &self.kind {
            FeatureKind::Wall { mesh, .. }
            | FeatureKind::Skin { mesh }
            | FeatureKind::Infill { mesh } => mesh.as_ref(),
            _ => None,
        }
    }

    /// The unrounded effective line width: nominal width scaled by flow,
    /// width factor and the config's flow ratio (µm). Kept fractional so a
    /// per-move width ratio can be applied before the single rounding at
    /// emission time.
    pub fn line_width_factor(&self) -> CoordF {
        self.flow * self.width_factor * self.config.line_width as CoordF * self.config.flow_ratio
    }

    /// The effective line width, rounded to whole micrometers.
    pub fn line_width(&self) -> Coord {
        self.line_width_factor().round() as Coord
    }

    /// Layer thickness of the config (µm).
    pub fn layer_thickness(&self) -> Coord {
        self.config.layer_thickness
    }

    /// Z offset of the config (µm).
    pub fn z_offset(&self) -> Coord {
        self.config.z_offset
    }

    /// Material per distance (mm³/mm).
    pub fn extrusion_mm3_per_mm(&self) -> CoordF {
        self.config.extrusion_mm3_per_mm
    }

    /// Extrusion flow ratio.
    pub fn flow(&self) -> CoordF {
        self.flow
    }

    /// Set the extrusion flow ratio.
    pub fn set_flow(&mut self, flow: CoordF) {
        self.flow = flow;
    }

    /// Line width factor (actual over nominal).
    pub fn width_factor(&self) -> CoordF {
        self.width_factor
    }

    /// Set the line width factor.
    pub fn set_width_factor(&mut self, width_factor: CoordF) {
        self.width_factor = width_factor;
    }

    /// Speed factor applied on top of the nominal speed.
    pub fn speed_factor(&self) -> CoordF {
        self.speed_factor
    }

    /// Set the speed factor.
    pub fn set_speed_factor(&mut self, speed_factor: CoordF) {
        self.speed_factor = speed_factor;
    }

    /// Back-pressure speed factor.
    pub fn speed_back_pressure_factor(&self) -> CoordF {
        self.speed_back_pressure_factor
    }

    /// Set the back-pressure speed factor.
    pub fn set_speed_back_pressure_factor(&mut self, factor: CoordF) {
        self.speed_back_pressure_factor = factor;
    }

    /// First position of the feature's leaves.
    pub fn find_start_position(&self) -> Option<Point3> {
        self.sequences
            .iter()
            .find_map(|sequence| sequence.find_start_position())
    }

    /// Last position of the feature's leaves.
    pub fn find_end_position(&self) -> Option<Point3> {
        self.sequences
            .iter()
            .rev()
            .find_map(|sequence| sequence.find_end_position())
    }

    /// Search this feature's descendants.
    pub fn find(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        find_in_children(&self.sequences, predicate, order, depth)
    }

    /// Emit all sequences in order.
    pub fn write(&self, exporter: &mut dyn PlanExporter, layer_plan: &LayerPlan) -> Result<()> {
        for sequence in &self.sequences {
            sequence.write(exporter, layer_plan, self)?;
        }
        Ok(())
    }
}
