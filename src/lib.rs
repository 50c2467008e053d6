//! # pathplan
//!
//! The path-planning core of an FFF slicer back-end.
//!
//! This library converts per-layer geometric regions into an ordered,
//! hierarchical plan of extruder motions ready to be emitted as machine
//! instructions:
//! - Variable-width wall generation (skeletal beading with contour stitching)
//! - A recursive print-operation tree (layers → extruder plans → feature
//!   extrusions → move sequences → moves)
//! - Transformer passes (travel insertion, smoothing, feature ordering,
//!   back-pressure compensation)
//! - Pluggable plan exporters (console, G-code, host communication, fan-out)
//!
//! ## Example
//!
//! ```rust,ignore
//! use pathplan::walls::{self};
//! use pathplan::settings::WallSettings;
//! use pathplan::geometry::Shape;
//!
//! let outline: Shape = /* one layer's outline */;
//! let (toolpaths, inner_contour) =
//!     walls::generate(&outline, 400, 400, 2, &WallSettings::default())?;
//! ```
//!
//! Mesh slicing, host messaging and G-code flavour handling live outside
//! this crate; the plan exporter interface is the wire between the core and
//! any consumer.

pub mod clipper;
pub mod export;
pub mod feature_generation;
pub mod geometry;
pub mod pipeline;
pub mod plan;
pub mod settings;
pub mod transform;
pub mod walls;

// Re-export commonly used types
pub use export::{
    CommunicationExporter, ConsoleExporter, GCodeExporter, MultiExporter, PlanExporter,
};
pub use feature_generation::{FeatureGenerator, WallFeatureGenerator};
pub use geometry::{Point, Point3, PointF, Polygon, Shape};
pub use pipeline::{ExtruderConfig, LayerInput, PipelineConfig, PlanPipeline};
pub use plan::{
    ContinuousExtruderMoveSequence, ExtruderMove, ExtruderPlan, FeatureExtrusion, FeatureKind,
    LayerPlan, MeshHandle, PathConfig, PrintFeatureType, SearchDepth, SearchOrder,
};
pub use settings::{
    BeadingStrategyType, FanSpeedLayerTimeSettings, RetractionConfig, SmoothSettings,
    SpeedDerivatives, WallSettings,
};
pub use transform::{
    apply, BackPressureCompensation, DirectTravelMoveGenerator, FeatureOrderingConstraint,
    FeatureOrderingConstraintsGenerator, FeatureReorderer, InsetOrderConstraintsGenerator,
    PathSmoother, PlanTransformer, TravelMoveGenerator, TravelMoveInserter,
};
pub use walls::{
    BeadingStrategy, ExtrusionJunction, ExtrusionLine, VariableWidthLines, VariableWidthPaths,
    WallToolPaths,
};

/// Coordinate type used throughout the planner.
/// Using i64 for integer coordinates (scaled by SCALING_FACTOR) to avoid
/// floating-point issues.
pub type Coord = i64;

/// Floating-point coordinate type for unscaled values.
pub type CoordF = f64;

/// Layer index type. Raft layers sit below zero.
pub type LayerIndex = i32;

/// Scaling factor: coordinates are stored as integers scaled by this factor.
/// 1 unit = 1 micrometer, so 1mm = 1_000 units.
pub const SCALING_FACTOR: f64 = 1_000.0;

/// Scale a floating-point coordinate (mm) to integer micrometers.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Unscale an integer micrometer coordinate to floating-point mm.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Result type used throughout the planner.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for planner operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("beading strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("export error: {0}")]
    Export(#[from] std::io::Error),

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("cancelled")]
    Cancelled,
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
