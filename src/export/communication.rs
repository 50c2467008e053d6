//! Forwarding plan events to a host application channel.

use super::PlanExporter;
use crate::geometry::Point3;
use crate::plan::PrintFeatureType;
use crate::{Coord, CoordF, LayerIndex};

/// A host communication channel. The messaging transport itself (sockets,
/// shared memory, protocol buffers) lives outside the core; the planner
/// only pushes line previews and layer lifecycle events into it.
pub trait Communication {
    /// A line was planned towards `to` with the given geometry.
    fn send_line_to(
        &mut self,
        feature: PrintFeatureType,
        to: Point3,
        line_width: Coord,
        line_thickness: Coord,
        speed: CoordF,
    );

    /// A layer is complete.
    fn send_layer_complete(&mut self, layer_index: LayerIndex, z: Coord, layer_thickness: Coord);
}

/// Forwards exporter calls to a host communication channel.
pub struct CommunicationExporter<C: Communication> {
    communication: C,
}

impl<C: Communication> CommunicationExporter<C> {
    pub fn new(communication: C) -> Self {
        Self { communication }
    }

    /// Hand the channel back.
    pub fn into_inner(self) -> C {
        self.communication
    }
}

impl<C: Communication> PlanExporter for CommunicationExporter<C> {
    fn write_layer_start(
        &mut self,
        _layer_index: LayerIndex,
        _start_position: Point3,
    ) -> std::io::Result<()> {
        Ok(())
    }

    fn write_extrusion(
        &mut self,
        p: Point3,
        speed: CoordF,
        _extrusion_mm3_per_mm: CoordF,
        line_width: Coord,
        line_thickness: Coord,
        feature: PrintFeatureType,
        _update_extrusion_offset: bool,
    ) -> std::io::Result<()> {
        self.communication
            .send_line_to(feature, p, line_width, line_thickness, speed);
        Ok(())
    }

    fn write_travel(
        &mut self,
        p: Point3,
        speed: CoordF,
        feature: PrintFeatureType,
    ) -> std::io::Result<()> {
        self.communication.send_line_to(feature, p, 0, 0, speed);
        Ok(())
    }

    fn write_layer_end(
        &mut self,
        layer_index: LayerIndex,
        z: Coord,
        layer_thickness: Coord,
    ) -> std::io::Result<()> {
        self.communication
            .send_layer_complete(layer_index, z, layer_thickness);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct BufferedChannel {
        lines: Vec<(PrintFeatureType, Point3)>,
        layers: Vec<LayerIndex>,
    }

    impl Communication for BufferedChannel {
        fn send_line_to(
            &mut self,
            feature: PrintFeatureType,
            to: Point3,
            _line_width: Coord,
            _line_thickness: Coord,
            _speed: CoordF,
        ) {
            self.lines.push((feature, to));
        }

        fn send_layer_complete(&mut self, layer_index: LayerIndex, _z: Coord, _thickness: Coord) {
            self.layers.push(layer_index);
        }
    }

    #[test]
    fn test_forwards_lines_and_layers() {
        let mut exporter = CommunicationExporter::new(BufferedChannel::default());
        exporter.write_layer_start(4, Point3::zero()).unwrap();
        exporter
            .write_extrusion(
                Point3::new(1000, 0, 0),
                30.0,
                0.1,
                400,
                200,
                PrintFeatureType::OuterWall,
                false,
            )
            .unwrap();
        exporter
            .write_travel(Point3::new(2000, 0, 0), 120.0, PrintFeatureType::MoveCombing)
            .unwrap();
        exporter.write_layer_end(4, 1000, 200).unwrap();

        let channel = exporter.into_inner();
        assert_eq!(channel.lines.len(), 2);
        assert_eq!(channel.lines[0].0, PrintFeatureType::OuterWall);
        assert_eq!(channel.lines[1].0, PrintFeatureType::MoveCombing);
        assert_eq!(channel.layers, vec![4]);
    }
}
