//! Transformer passes over the print-operation tree.
//!
//! A transformer visits the nodes it cares about through the
//! [`PlanTransformer`] visitor; [`apply`] drives the traversal. Children are
//! visited first-to-last and a sequence node is recursed into before the
//! node itself is processed, so transformers observe fully processed
//! subtrees.
//!
//! The core passes:
//! - [`TravelMoveInserter`] connects feature endpoints with travel routes
//! - [`PathSmoother`] relaxes micro-segments left by the wall generator
//! - [`FeatureReorderer`] applies ordering constraints between features
//! - [`BackPressureCompensation`] stabilizes volumetric flow on thin lines

mod back_pressure;
mod ordering;
mod smooth;
mod travel;

pub use back_pressure::BackPressureCompensation;
pub use ordering::{
    FeatureOrderingConstraint, FeatureOrderingConstraintsGenerator, FeatureReorderer,
    InsetOrderConstraintsGenerator,
};
pub use smooth::{smooth, PathSmoother, SmoothablePoint};
pub use travel::{DirectTravelMoveGenerator, TravelMoveGenerator, TravelMoveInserter};

use crate::plan::{
    ContinuousExtruderMoveSequence, ExtruderMove, ExtruderPlan, FeatureExtrusion, LayerPlan,
};

/// A pass over the operation tree. Implement the hooks for the node types
/// the pass wants to visit; the rest default to no-ops.
pub trait PlanTransformer {
    fn process_layer_plan(&mut self, _layer_plan: &mut LayerPlan) {}
    fn process_extruder_plan(&mut self, _extruder_plan: &mut ExtruderPlan) {}
    fn process_feature(&mut self, _feature: &mut FeatureExtrusion) {}
    fn process_sequence(&mut self, _sequence: &mut ContinuousExtruderMoveSequence) {}
    fn process_move(&mut self, _extruder_move: &mut ExtruderMove) {}
}

/// Apply a transformer to a layer plan, depth-first: children in order,
/// each sequence node recursed into before being processed itself.
pub fn apply(layer_plan: &mut LayerPlan, transformer: &mut dyn PlanTransformer) {
    for extruder_plan in layer_plan.extruder_plans_mut() {
        for feature in extruder_plan.features_mut() {
            for sequence in feature.sequences_mut() {
                for extruder_move in sequence.moves_mut() {
                    transformer.process_move(extruder_move);
                }
                transformer.process_sequence(sequence);
            }
            transformer.process_feature(feature);
        }
        transformer.process_extruder_plan(extruder_plan);
    }
    transformer.process_layer_plan(layer_plan);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use crate::plan::{PathConfig, PrintFeatureType};
    use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};

    #[derive(Default)]
    struct OrderProbe {
        events: Vec<&'static str>,
    }

    impl PlanTransformer for OrderProbe {
        fn process_layer_plan(&mut self, _: &mut LayerPlan) {
            self.events.push("layer");
        }
        fn process_extruder_plan(&mut self, _: &mut ExtruderPlan) {
            self.events.push("extruder");
        }
        fn process_feature(&mut self, _: &mut FeatureExtrusion) {
            self.events.push("feature");
        }
        fn process_sequence(&mut self, _: &mut ContinuousExtruderMoveSequence) {
            self.events.push("sequence");
        }
        fn process_move(&mut self, _: &mut ExtruderMove) {
            self.events.push("move");
        }
    }

    #[test]
    fn test_children_processed_before_their_parent() {
        let mut layer = LayerPlan::new(0, 200, 200);
        let mut plan = ExtruderPlan::new(
            0,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        );
        let config = PathConfig::new(PrintFeatureType::OuterWall, 400, 200, 30.0);
        let mut feature = FeatureExtrusion::wall(config, None, 0);
        let mut sequence = ContinuousExtruderMoveSequence::new(false, Point3::zero());
        sequence.push_move(ExtruderMove::extrusion(Point3::new(1000, 0, 0)));
        feature.append_sequence(sequence, true);
        plan.append_feature(feature, true);
        layer.append_extruder_plan(plan, true);

        let mut probe = OrderProbe::default();
        apply(&mut layer, &mut probe);
        assert_eq!(
            probe.events,
            vec!["move", "sequence", "feature", "extruder", "layer"]
        );
    }
}
