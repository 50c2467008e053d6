//! Minimal G-code emission.
//!
//! Formats the plan as G0/G1 moves with volumetric extrusion resolved to
//! filament length. Flavour handling, headers, temperature control and the
//! rest of a machine dialect live outside the core; this exporter produces
//! the motion section a dialect layer can wrap.

use std::f64::consts::PI;
use std::io::Write;

use super::PlanExporter;
use crate::geometry::Point3;
use crate::plan::PrintFeatureType;
use crate::{unscale, Coord, CoordF, LayerIndex};

/// Writes plan motions as G-code lines into any writer.
pub struct GCodeExporter<W: Write> {
    writer: W,
    filament_diameter: CoordF,
    last_position: Option<Point3>,
    extruded_mm: CoordF,
}

impl<W: Write> GCodeExporter<W> {
    /// Create an exporter for 1.75mm filament.
    pub fn new(writer: W) -> Self {
        Self::with_filament_diameter(writer, 1.75)
    }

    /// Create an exporter for a specific filament diameter (mm).
    pub fn with_filament_diameter(writer: W, filament_diameter: CoordF) -> Self {
        Self {
            writer,
            filament_diameter,
            last_position: None,
            extruded_mm: 0.0,
        }
    }

    /// Total filament pushed so far (mm).
    pub fn extruded_mm(&self) -> CoordF {
        self.extruded_mm
    }

    /// Finish writing and hand the writer back.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn filament_area(&self) -> CoordF {
        PI * (self.filament_diameter / 2.0) * (self.filament_diameter / 2.0)
    }

    fn distance_mm(&self, to: Point3) -> CoordF {
        match self.last_position {
            Some(from) => {
                let dx = unscale(to.x - from.x);
                let dy = unscale(to.y - from.y);
                let dz = unscale(to.z - from.z);
                (dx * dx + dy * dy + dz * dz).sqrt()
            }
            None => 0.0,
        }
    }
}

impl<W: Write> PlanExporter for GCodeExporter<W> {
    fn write_layer_start(
        &mut self,
        layer_index: LayerIndex,
        start_position: Point3,
    ) -> std::io::Result<()> {
        writeln!(self.writer, ";LAYER:{layer_index}")?;
        writeln!(
            self.writer,
            "G0 X{:.3} Y{:.3} Z{:.3}",
            unscale(start_position.x),
            unscale(start_position.y),
            unscale(start_position.z)
        )?;
        self.last_position = Some(start_position);
        Ok(())
    }

    fn write_extrusion(
        &mut self,
        p: Point3,
        speed: CoordF,
        extrusion_mm3_per_mm: CoordF,
        _line_width: Coord,
        _line_thickness: Coord,
        _feature: PrintFeatureType,
        _update_extrusion_offset: bool,
    ) -> std::io::Result<()> {
        let volume = extrusion_mm3_per_mm * self.distance_mm(p);
        self.extruded_mm += volume / self.filament_area();
        writeln!(
            self.writer,
            "G1 X{:.3} Y{:.3} Z{:.3} E{:.5} F{:.0}",
            unscale(p.x),
            unscale(p.y),
            unscale(p.z),
            self.extruded_mm,
            speed * 60.0
        )?;
        self.last_position = Some(p);
        Ok(())
    }

    fn write_travel(
        &mut self,
        p: Point3,
        speed: CoordF,
        _feature: PrintFeatureType,
    ) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "G0 X{:.3} Y{:.3} Z{:.3} F{:.0}",
            unscale(p.x),
            unscale(p.y),
            unscale(p.z),
            speed * 60.0
        )?;
        self.last_position = Some(p);
        Ok(())
    }

    fn write_layer_end(
        &mut self,
        _layer_index: LayerIndex,
        _z: Coord,
        _layer_thickness: Coord,
    ) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_and_moves_format() {
        let mut exporter = GCodeExporter::new(Vec::new());
        exporter.write_layer_start(0, Point3::new(0, 0, 200)).unwrap();
        exporter
            .write_extrusion(
                Point3::new(10_000, 0, 200),
                30.0,
                0.1,
                400,
                200,
                PrintFeatureType::OuterWall,
                false,
            )
            .unwrap();
        exporter
            .write_travel(Point3::new(20_000, 0, 200), 120.0, PrintFeatureType::MoveRetraction)
            .unwrap();
        exporter.write_layer_end(0, 200, 200).unwrap();

        let output = String::from_utf8(exporter.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], ";LAYER:0");
        assert_eq!(lines[1], "G0 X0.000 Y0.000 Z0.200");
        assert!(lines[2].starts_with("G1 X10.000 Y0.000 Z0.200 E"));
        assert!(lines[2].ends_with("F1800"));
        assert_eq!(lines[3], "G0 X20.000 Y0.000 Z0.200 F7200");
    }

    #[test]
    fn test_extrusion_accumulates() {
        let mut exporter = GCodeExporter::new(Vec::new());
        exporter.write_layer_start(0, Point3::new(0, 0, 0)).unwrap();
        exporter
            .write_extrusion(
                Point3::new(10_000, 0, 0),
                30.0,
                0.1,
                400,
                200,
                PrintFeatureType::OuterWall,
                false,
            )
            .unwrap();
        let after_first = exporter.extruded_mm();
        assert!(after_first > 0.0);
        exporter
            .write_extrusion(
                Point3::new(20_000, 0, 0),
                30.0,
                0.1,
                400,
                200,
                PrintFeatureType::OuterWall,
                false,
            )
            .unwrap();
        // 10mm at 0.1mm³/mm = 1mm³ per segment; E grows monotonically.
        assert!((exporter.extruded_mm() - 2.0 * after_first).abs() < 1e-9);
    }
}
