//! Layer plans: the root of the print-operation tree for one layer.

use super::extruder::ExtruderPlan;
use super::{find_in_children, OperationRef, SearchDepth, SearchOrder};
use crate::export::PlanExporter;
use crate::geometry::Point3;
use crate::{Coord, LayerIndex, Result};

/// Everything printed in one layer: a sequence of extruder plans.
///
/// Positions within the tree store z relative to the layer; this node
/// supplies the absolute z during emission.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPlan {
    layer_index: LayerIndex,
    z: Coord,
    thickness: Coord,
    extruder_plans: Vec<ExtruderPlan>,
}

impl LayerPlan {
    /// Create an empty layer plan.
    pub fn new(layer_index: LayerIndex, z: Coord, thickness: Coord) -> Self {
        Self {
            layer_index,
            z,
            thickness,
            extruder_plans: Vec::new(),
        }
    }

    /// The layer number.
    pub fn layer_index(&self) -> LayerIndex {
        self.layer_index
    }

    /// Absolute z of the layer top (µm).
    pub fn z(&self) -> Coord {
        self.z
    }

    /// Layer thickness (µm).
    pub fn thickness(&self) -> Coord {
        self.thickness
    }

    /// Append an extruder plan. With `check_non_empty`, empty plans are
    /// silently dropped.
    pub fn append_extruder_plan(&mut self, plan: ExtruderPlan, check_non_empty: bool) {
        if !check_non_empty || !plan.is_empty() {
            self.extruder_plans.push(plan);
        }
    }

    /// The owned extruder plans, in print order.
    pub fn extruder_plans(&self) -> &[ExtruderPlan] {
        &self.extruder_plans
    }

    /// Mutable access to the extruder plans.
    pub fn extruder_plans_mut(&mut self) -> &mut Vec<ExtruderPlan> {
        &mut self.extruder_plans
    }

    /// True if the layer holds no extruder plans.
    pub fn is_empty(&self) -> bool {
        self.extruder_plans.is_empty()
    }

    /// First position of the layer's leaves (layer-relative z).
    pub fn find_start_position(&self) -> Option<Point3> {
        self.extruder_plans
            .iter()
            .find_map(|plan| plan.find_start_position())
    }

    /// Last position of the layer's leaves (layer-relative z).
    pub fn find_end_position(&self) -> Option<Point3> {
        self.extruder_plans
            .iter()
            .rev()
            .find_map(|plan| plan.find_end_position())
    }

    /// Resolve a layer-relative position to an absolute one.
    pub fn absolute_position(&self, relative: Point3) -> Point3 {
        Point3::new(relative.x, relative.y, self.z + relative.z)
    }

    /// Search this layer's descendants.
    pub fn find(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        find_in_children(&self.extruder_plans, predicate, order, depth)
    }

    /// Emit the layer: a layer-start call, the in-order leaves, then a
    /// layer-end call.
    pub fn write(&self, exporter: &mut dyn PlanExporter) -> Result<()> {
        let start_position = self
            .find_start_position()
            .map(|p| self.absolute_position(p))
            .unwrap_or_else(|| Point3::new(0, 0, self.z));
        exporter.write_layer_start(self.layer_index, start_position)?;
        for plan in &self.extruder_plans {
            plan.write(exporter, self)?;
        }
        exporter.write_layer_end(self.layer_index, self.z, self.thickness)?;
        Ok(())
    }
}
