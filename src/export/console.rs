//! Human-readable plan trace.

use log::info;

use super::PlanExporter;
use crate::geometry::Point3;
use crate::plan::PrintFeatureType;
use crate::{unscale, Coord, CoordF, LayerIndex};

/// Logs every plan event at info level. Useful for debugging a plan without
/// wiring up a machine-facing exporter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleExporter;

impl ConsoleExporter {
    pub fn new() -> Self {
        Self
    }
}

impl PlanExporter for ConsoleExporter {
    fn write_layer_start(
        &mut self,
        layer_index: LayerIndex,
        start_position: Point3,
    ) -> std::io::Result<()> {
        info!(
            "LAYER {layer_index} start at ({:.3}, {:.3}, {:.3})",
            unscale(start_position.x),
            unscale(start_position.y),
            unscale(start_position.z)
        );
        Ok(())
    }

    fn write_extrusion(
        &mut self,
        p: Point3,
        speed: CoordF,
        extrusion_mm3_per_mm: CoordF,
        line_width: Coord,
        _line_thickness: Coord,
        feature: PrintFeatureType,
        _update_extrusion_offset: bool,
    ) -> std::io::Result<()> {
        info!(
            "EXTRUSION ({:.3}, {:.3}, {:.3}) {} w={:.3} at {speed:.1}mm/s, {extrusion_mm3_per_mm:.4}mm3/mm",
            unscale(p.x),
            unscale(p.y),
            unscale(p.z),
            feature.name(),
            unscale(line_width),
        );
        Ok(())
    }

    fn write_travel(
        &mut self,
        p: Point3,
        speed: CoordF,
        feature: PrintFeatureType,
    ) -> std::io::Result<()> {
        info!(
            "TRAVEL ({:.3}, {:.3}, {:.3}) {} at {speed:.1}mm/s",
            unscale(p.x),
            unscale(p.y),
            unscale(p.z),
            feature.name(),
        );
        Ok(())
    }

    fn write_layer_end(
        &mut self,
        layer_index: LayerIndex,
        z: Coord,
        layer_thickness: Coord,
    ) -> std::io::Result<()> {
        info!(
            "LAYER {layer_index} end, z={:.3} thickness={:.3}",
            unscale(z),
            unscale(layer_thickness)
        );
        Ok(())
    }
}
