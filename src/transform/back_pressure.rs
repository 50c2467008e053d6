//! Back-pressure compensation pass.

use super::PlanTransformer;
use crate::plan::ExtruderPlan;

/// Applies back-pressure compensation to every extruder plan: thinner-than-
/// nominal lines get a proportionally higher speed factor so the extruder
/// keeps up. A ratio of zero disables the pass.
#[derive(Debug, Clone, Copy)]
pub struct BackPressureCompensation {
    ratio: f64,
}

impl BackPressureCompensation {
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }
}

impl PlanTransformer for BackPressureCompensation {
    fn process_extruder_plan(&mut self, extruder_plan: &mut ExtruderPlan) {
        if self.ratio != 0.0 {
            extruder_plan.apply_back_pressure_compensation(self.ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use crate::plan::{
        ContinuousExtruderMoveSequence, ExtruderMove, FeatureExtrusion, LayerPlan, PathConfig,
        PrintFeatureType,
    };
    use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};
    use crate::transform::apply;

    #[test]
    fn test_zero_ratio_disables_the_pass() {
        let config = PathConfig::new(PrintFeatureType::OuterWall, 400, 200, 30.0);
        let mut feature = FeatureExtrusion::wall(config, None, 0);
        feature.set_width_factor(0.5);
        let mut sequence = ContinuousExtruderMoveSequence::new(false, Point3::zero());
        sequence.push_move(ExtruderMove::extrusion(Point3::new(1000, 0, 0)));
        feature.append_sequence(sequence, true);

        let mut plan = ExtruderPlan::new(
            0,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        );
        plan.append_feature(feature, true);
        let mut layer = LayerPlan::new(0, 200, 200);
        layer.append_extruder_plan(plan, true);

        apply(&mut layer, &mut BackPressureCompensation::new(0.0));
        let factor = layer.extruder_plans()[0].features()[0].speed_back_pressure_factor();
        assert!((factor - 1.0).abs() < 1e-12);

        apply(&mut layer, &mut BackPressureCompensation::new(0.5));
        let factor = layer.extruder_plans()[0].features()[0].speed_back_pressure_factor();
        assert!((factor - 1.5).abs() < 1e-9);
    }
}
