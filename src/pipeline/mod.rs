//! The planning pipeline: parallel layer building, ordered emission.
//!
//! Building a layer plan (wall generation, feature population and all
//! transformer passes) is independent per layer and runs on a rayon worker
//! pool. Completed plans are handed to the exporter strictly in ascending
//! layer order from a single emission thread.
//!
//! The pipeline is cancellable at layer boundaries: the flag is observed
//! before building and before emitting each layer, and in-flight workers
//! complete their current layer.

use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;
use rayon::prelude::*;

use crate::export::PlanExporter;
use crate::feature_generation::FeatureGenerator;
use crate::geometry::Shape;
use crate::plan::{ExtruderPlan, LayerPlan};
use crate::settings::{
    FanSpeedLayerTimeSettings, RetractionConfig, SmoothSettings, SpeedDerivatives,
};
use crate::transform::{
    apply, BackPressureCompensation, FeatureReorderer, InsetOrderConstraintsGenerator,
    PathSmoother, TravelMoveInserter,
};
use crate::{Coord, Error, LayerIndex, Result};

/// The geometric input for one layer.
#[derive(Debug, Clone)]
pub struct LayerInput {
    /// The layer number.
    pub layer_index: LayerIndex,
    /// Absolute z of the layer top (µm).
    pub z: Coord,
    /// Layer thickness (µm).
    pub thickness: Coord,
    /// The layer outline.
    pub outline: Shape,
}

/// Static configuration of one extruder.
#[derive(Debug, Clone)]
pub struct ExtruderConfig {
    pub extruder_nr: usize,
    pub travel_speed: SpeedDerivatives,
    pub fan_speed_layer_time_settings: FanSpeedLayerTimeSettings,
    pub retraction_config: RetractionConfig,
}

impl Default for ExtruderConfig {
    fn default() -> Self {
        Self {
            extruder_nr: 0,
            travel_speed: SpeedDerivatives::default(),
            fan_speed_layer_time_settings: FanSpeedLayerTimeSettings::default(),
            retraction_config: RetractionConfig::default(),
        }
    }
}

/// Configuration for the planning pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The machine's extruders.
    pub extruders: Vec<ExtruderConfig>,

    /// Smoothing thresholds.
    pub smooth: SmoothSettings,

    /// Back-pressure compensation ratio; zero disables the pass.
    pub back_pressure_compensation: f64,

    /// Print outer walls before inner walls.
    pub outer_walls_first: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extruders: vec![ExtruderConfig::default()],
            smooth: SmoothSettings::default(),
            back_pressure_compensation: 0.0,
            outer_walls_first: false,
        }
    }
}

/// Drives plan construction and emission over a set of layers.
pub struct PlanPipeline {
    config: PipelineConfig,
    generators: Vec<Box<dyn FeatureGenerator>>,
}

impl PlanPipeline {
    /// Create a pipeline with no feature generators.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            generators: Vec::new(),
        }
    }

    /// Register a feature generator.
    pub fn add_generator(&mut self, generator: Box<dyn FeatureGenerator>) {
        self.generators.push(generator);
    }

    /// Build the plans for all layers in parallel and emit them in
    /// ascending layer order through the exporter.
    ///
    /// Cancellation is observed at layer boundaries; a set flag surfaces as
    /// [`Error::Cancelled`]. Exporter failures are reported to the caller
    /// and leave the in-memory state intact.
    pub fn process(
        &self,
        layers: &[LayerInput],
        exporter: &mut dyn PlanExporter,
        cancel: &AtomicBool,
    ) -> Result<()> {
        // Build phase: parallel, one task per layer.
        let mut built: Vec<(LayerIndex, Result<LayerPlan>)> = layers
            .par_iter()
            .map(|input| {
                if cancel.load(Ordering::Relaxed) {
                    return (input.layer_index, Err(Error::Cancelled));
                }
                (input.layer_index, self.build_layer(input))
            })
            .collect();

        // Emission phase: single-threaded, strictly ascending layer order.
        built.sort_by_key(|(layer_index, _)| *layer_index);
        for (_, result) in built {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
            let layer_plan = result?;
            layer_plan.write(exporter)?;
        }
        Ok(())
    }

    /// Build one layer plan: empty extruder plans, feature generation, then
    /// the transformer passes.
    pub fn build_layer(&self, input: &LayerInput) -> Result<LayerPlan> {
        let mut extruder_plans: Vec<ExtruderPlan> = self
            .config
            .extruders
            .iter()
            .map(|extruder| {
                ExtruderPlan::new(
                    extruder.extruder_nr,
                    extruder.travel_speed,
                    extruder.fan_speed_layer_time_settings,
                    extruder.retraction_config,
                )
            })
            .collect();

        for generator in &self.generators {
            if !generator.is_active() {
                continue;
            }
            match generator.generate_features(input, &mut extruder_plans) {
                Ok(()) => {}
                Err(Error::StrategyUnavailable(reason)) => {
                    // The layer prints without the affected walls.
                    warn!(
                        "beading strategy unavailable on layer {}: {reason}",
                        input.layer_index
                    );
                }
                Err(error) => return Err(error),
            }
        }

        let mut layer_plan = LayerPlan::new(input.layer_index, input.z, input.thickness);
        for extruder_plan in extruder_plans {
            layer_plan.append_extruder_plan(extruder_plan, true);
        }

        apply(&mut layer_plan, &mut PathSmoother::new(self.config.smooth));

        let mut reorderer = FeatureReorderer::new();
        reorderer.add_generator(Box::new(InsetOrderConstraintsGenerator {
            outer_first: self.config.outer_walls_first,
        }));
        apply(&mut layer_plan, &mut reorderer);

        apply(&mut layer_plan, &mut TravelMoveInserter::direct());

        apply(
            &mut layer_plan,
            &mut BackPressureCompensation::new(self.config.back_pressure_compensation),
        );

        Ok(layer_plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_generation::WallFeatureGenerator;
    use crate::geometry::{Point, Point3, Polygon};
    use crate::plan::{PathConfig, PrintFeatureType};
    use crate::scale;
    use crate::settings::WallSettings;
    use crate::{Coord, CoordF};

    fn square_layers(count: usize) -> Vec<LayerInput> {
        (0..count)
            .map(|i| LayerInput {
                layer_index: i as LayerIndex,
                z: 200 * (i as Coord + 1),
                thickness: 200,
                outline: Shape::from_polygons(vec![Polygon::rectangle(
                    Point::new(0, 0),
                    Point::new(scale(10.0), scale(10.0)),
                )]),
            })
            .collect()
    }

    fn wall_generator(bead_width: Coord) -> Box<WallFeatureGenerator> {
        Box::new(WallFeatureGenerator::new(
            0,
            bead_width,
            bead_width,
            2,
            WallSettings::default(),
            PathConfig::new(PrintFeatureType::OuterWall, bead_width, 200, 25.0),
            PathConfig::new(PrintFeatureType::InnerWall, bead_width, 200, 40.0),
            None,
        ))
    }

    /// Records layer lifecycle events and counts moves.
    #[derive(Default)]
    struct ProbeExporter {
        layer_events: Vec<(String, LayerIndex)>,
        extrusions: usize,
        travels: usize,
    }

    impl PlanExporter for ProbeExporter {
        fn write_layer_start(
            &mut self,
            layer_index: LayerIndex,
            _start_position: Point3,
        ) -> std::io::Result<()> {
            self.layer_events.push(("start".into(), layer_index));
            Ok(())
        }

        fn write_extrusion(
            &mut self,
            _p: Point3,
            _speed: CoordF,
            _mm3: CoordF,
            _w: Coord,
            _t: Coord,
            _f: PrintFeatureType,
            _u: bool,
        ) -> std::io::Result<()> {
            self.extrusions += 1;
            Ok(())
        }

        fn write_travel(
            &mut self,
            _p: Point3,
            _speed: CoordF,
            _f: PrintFeatureType,
        ) -> std::io::Result<()> {
            self.travels += 1;
            Ok(())
        }

        fn write_layer_end(
            &mut self,
            layer_index: LayerIndex,
            _z: Coord,
            _thickness: Coord,
        ) -> std::io::Result<()> {
            self.layer_events.push(("end".into(), layer_index));
            Ok(())
        }
    }

    #[test]
    fn test_layers_emitted_in_ascending_order() {
        let mut pipeline = PlanPipeline::new(PipelineConfig::default());
        pipeline.add_generator(wall_generator(400));

        let mut exporter = ProbeExporter::default();
        let cancel = AtomicBool::new(false);
        pipeline
            .process(&square_layers(3), &mut exporter, &cancel)
            .unwrap();

        let expected: Vec<(String, LayerIndex)> = vec![
            ("start".into(), 0),
            ("end".into(), 0),
            ("start".into(), 1),
            ("end".into(), 1),
            ("start".into(), 2),
            ("end".into(), 2),
        ];
        assert_eq!(exporter.layer_events, expected);
        assert!(exporter.extrusions > 0);
        // Two disconnected walls per layer get a connecting travel.
        assert!(exporter.travels > 0);
    }

    #[test]
    fn test_cancellation_before_emission() {
        let mut pipeline = PlanPipeline::new(PipelineConfig::default());
        pipeline.add_generator(wall_generator(400));

        let mut exporter = ProbeExporter::default();
        let cancel = AtomicBool::new(true);
        let result = pipeline.process(&square_layers(2), &mut exporter, &cancel);
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(exporter.layer_events.is_empty());
    }

    #[test]
    fn test_strategy_failure_yields_empty_walls() {
        let mut pipeline = PlanPipeline::new(PipelineConfig::default());
        // Zero bead width: strategy construction fails, layers still flow.
        pipeline.add_generator(wall_generator(0));

        let mut exporter = ProbeExporter::default();
        let cancel = AtomicBool::new(false);
        pipeline
            .process(&square_layers(1), &mut exporter, &cancel)
            .unwrap();

        assert_eq!(exporter.extrusions, 0);
        assert_eq!(exporter.layer_events.len(), 2);
    }

    #[test]
    fn test_build_layer_orders_walls_inner_first_by_default() {
        let mut pipeline = PlanPipeline::new(PipelineConfig::default());
        pipeline.add_generator(wall_generator(400));

        let layer = pipeline.build_layer(&square_layers(1)[0]).unwrap();
        let insets: Vec<usize> = layer.extruder_plans()[0]
            .features()
            .iter()
            .filter_map(|f| f.inset_index())
            .collect();
        assert_eq!(insets, vec![1, 0]);
    }
}
