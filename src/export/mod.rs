//! Plan exporters: pluggable sinks for emitting a finished plan.
//!
//! The [`PlanExporter`] trait is the wire between the planning core and any
//! consumer. The core ships four implementations:
//! - [`MultiExporter`] fans every call out to an ordered list of children
//! - [`ConsoleExporter`] logs a human-readable trace
//! - [`GCodeExporter`] formats minimal machine instructions
//! - [`CommunicationExporter`] forwards calls to a host communication
//!   channel
//!
//! Exporter calls happen strictly in ascending layer order, and within one
//! layer in the plan's traversal order; concurrent calls into a single
//! exporter are forbidden (emission is single-threaded).

mod communication;
mod console;
mod gcode;
mod multi;

pub use communication::{Communication, CommunicationExporter};
pub use console::ConsoleExporter;
pub use gcode::GCodeExporter;
pub use multi::MultiExporter;

use crate::geometry::Point3;
use crate::plan::PrintFeatureType;
use crate::{Coord, CoordF, LayerIndex};

/// A sink for plan emission.
///
/// Implementations may block on I/O; failures are reported to the driver
/// and must not corrupt the in-memory plan.
pub trait PlanExporter {
    /// A layer is about to be emitted, starting at the given position.
    fn write_layer_start(
        &mut self,
        layer_index: LayerIndex,
        start_position: Point3,
    ) -> std::io::Result<()>;

    /// An extruding motion to `p`.
    #[allow(clippy::too_many_arguments)]
    fn write_extrusion(
        &mut self,
        p: Point3,
        speed: CoordF,
        extrusion_mm3_per_mm: CoordF,
        line_width: Coord,
        line_thickness: Coord,
        feature: PrintFeatureType,
        update_extrusion_offset: bool,
    ) -> std::io::Result<()>;

    /// A non-extruding motion to `p`.
    fn write_travel(
        &mut self,
        p: Point3,
        speed: CoordF,
        feature: PrintFeatureType,
    ) -> std::io::Result<()>;

    /// The layer at the given z and thickness has been fully emitted.
    fn write_layer_end(
        &mut self,
        layer_index: LayerIndex,
        z: Coord,
        layer_thickness: Coord,
    ) -> std::io::Result<()>;
}
