//! Fan-out to multiple exporters.

use log::warn;

use super::PlanExporter;
use crate::geometry::Point3;
use crate::plan::PrintFeatureType;
use crate::{Coord, CoordF, LayerIndex};

/// Forwards every exporter call to an ordered list of child exporters.
///
/// Children are called in registration order and each is independently
/// best-effort: a failing child is logged and does not stop the others.
#[derive(Default)]
pub struct MultiExporter {
    exporters: Vec<Box<dyn PlanExporter>>,
}

impl MultiExporter {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a child exporter at the end of the call order.
    pub fn append_exporter(&mut self, exporter: Box<dyn PlanExporter>) {
        self.exporters.push(exporter);
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.exporters.len()
    }

    /// True if no children are registered.
    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }

    fn for_each(
        &mut self,
        call: impl Fn(&mut dyn PlanExporter) -> std::io::Result<()>,
    ) -> std::io::Result<()> {
        for exporter in &mut self.exporters {
            if let Err(error) = call(exporter.as_mut()) {
                warn!("exporter failed, continuing with the others: {error}");
            }
        }
        Ok(())
    }
}

impl PlanExporter for MultiExporter {
    fn write_layer_start(
        &mut self,
        layer_index: LayerIndex,
        start_position: Point3,
    ) -> std::io::Result<()> {
        self.for_each(|exporter| exporter.write_layer_start(layer_index, start_position))
    }

    fn write_extrusion(
        &mut self,
        p: Point3,
        speed: CoordF,
        extrusion_mm3_per_mm: CoordF,
        line_width: Coord,
        line_thickness: Coord,
        feature: PrintFeatureType,
        update_extrusion_offset: bool,
    ) -> std::io::Result<()> {
        self.for_each(|exporter| {
            exporter.write_extrusion(
                p,
                speed,
                extrusion_mm3_per_mm,
                line_width,
                line_thickness,
                feature,
                update_extrusion_offset,
            )
        })
    }

    fn write_travel(
        &mut self,
        p: Point3,
        speed: CoordF,
        feature: PrintFeatureType,
    ) -> std::io::Result<()> {
        self.for_each(|exporter| exporter.write_travel(p, speed, feature))
    }

    fn write_layer_end(
        &mut self,
        layer_index: LayerIndex,
        z: Coord,
        layer_thickness: Coord,
    ) -> std::io::Result<()> {
        self.for_each(|exporter| exporter.write_layer_end(layer_index, z, layer_thickness))
    }
}
