//! Per-extruder plans within a layer.

use super::feature::FeatureExtrusion;
use super::layer::LayerPlan;
use super::{find_in_children, OperationRef, SearchDepth, SearchOrder};
use crate::export::PlanExporter;
use crate::geometry::Point3;
use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};
use crate::Result;

/// Everything one extruder prints within a layer, in print order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtruderPlan {
    extruder_nr: usize,
    travel_speed: SpeedDerivatives,
    fan_speed_layer_time_settings: FanSpeedLayerTimeSettings,
    retraction_config: RetractionConfig,
    fan_speed: f64,
    features: Vec<FeatureExtrusion>,
}

impl ExtruderPlan {
    /// Create an empty plan for the given extruder.
    pub fn new(
        extruder_nr: usize,
        travel_speed: SpeedDerivatives,
        fan_speed_layer_time_settings: FanSpeedLayerTimeSettings,
        retraction_config: RetractionConfig,
    ) -> Self {
        let fan_speed = fan_speed_layer_time_settings.fan_speed;
        Self {
            extruder_nr,
            travel_speed,
            fan_speed_layer_time_settings,
            retraction_config,
            fan_speed,
            features: Vec::new(),
        }
    }

    /// The extruder this plan belongs to.
    pub fn extruder_nr(&self) -> usize {
        self.extruder_nr
    }

    /// Travel speed for moves between features.
    pub fn travel_speed(&self) -> &SpeedDerivatives {
        &self.travel_speed
    }

    /// Fan-speed and layer-time settings.
    pub fn fan_speed_layer_time_settings(&self) -> &FanSpeedLayerTimeSettings {
        &self.fan_speed_layer_time_settings
    }

    /// Retraction behaviour of this extruder.
    pub fn retraction_config(&self) -> &RetractionConfig {
        &self.retraction_config
    }

    /// Current fan speed (fraction, 0..=1).
    pub fn fan_speed(&self) -> f64 {
        self.fan_speed
    }

    /// Override the fan speed.
    pub fn set_fan_speed(&mut self, fan_speed: f64) {
        self.fan_speed = fan_speed;
    }

    /// Append a feature extrusion. With `check_non_empty`, empty features
    /// are silently dropped.
    pub fn append_feature(&mut self, feature: FeatureExtrusion, check_non_empty: bool) {
        if !check_non_empty || !feature.is_empty() {
            self.features.push(feature);
        }
    }

    /// The owned features, in print order.
    pub fn features(&self) -> &[FeatureExtrusion] {
        &self.features
    }

    /// Mutable access to the features.
    pub fn features_mut(&mut self) -> &mut Vec<FeatureExtrusion> {
        &mut self.features
    }

    /// True if the plan holds no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Find the plan for an extruder in a set of plans.
    pub fn for_extruder(plans: &mut [ExtruderPlan], extruder_nr: usize) -> Option<&mut ExtruderPlan> {
        plans.iter_mut().find(|plan| plan.extruder_nr == extruder_nr)
    }

    /// Raise the speed of thinner-than-nominal lines so volumetric
    /// throughput stays stable. Travel and bridge features are exempt; the
    /// factor never drops below a small epsilon so printers cannot stall.
    pub fn apply_back_pressure_compensation(&mut self, back_pressure_compensation: f64) {
        // Not an actual 'limit double minimum', because we don't want
        // printers to stall.
        const EPSILON_SPEED_FACTOR: f64 = 0.001;
        for feature in &mut self.features {
            let nominal_width = feature.config().line_width as f64;
            if feature.width_factor() <= 0.0
                || nominal_width <= 0.0
                || feature.is_travel()
                || feature.is_bridge()
            {
                continue;
            }
            let line_width = feature.width_factor() * nominal_width;
            let factor = EPSILON_SPEED_FACTOR
                .max(1.0 + (nominal_width / line_width - 1.0) * back_pressure_compensation);
            feature.set_speed_back_pressure_factor(factor);
        }
    }

    /// First position of this plan's leaves.
    pub fn find_start_position(&self) -> Option<Point3> {
        self.features
            .iter()
            .find_map(|feature| feature.find_start_position())
    }

    /// Last position of this plan's leaves.
    pub fn find_end_position(&self) -> Option<Point3> {
        self.features
            .iter()
            .rev()
            .find_map(|feature| feature.find_end_position())
    }

    /// Search this plan's descendants.
    pub fn find(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        find_in_children(&self.features, predicate, order, depth)
    }

    /// Emit all features in order.
    pub fn write(&self, exporter: &mut dyn PlanExporter, layer_plan: &LayerPlan) -> Result<()> {
        for feature in &self.features {
            feature.write(exporter, layer_plan)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::feature::{PathConfig, PrintFeatureType};
    use crate::plan::sequence::{ContinuousExtruderMoveSequence, ExtruderMove};

    fn wall_feature(width_factor: f64) -> FeatureExtrusion {
        let config = PathConfig::new(PrintFeatureType::OuterWall, 400, 200, 30.0);
        let mut feature = FeatureExtrusion::wall(config, None, 0);
        feature.set_width_factor(width_factor);
        let mut sequence = ContinuousExtruderMoveSequence::new(false, Point3::zero());
        sequence.push_move(ExtruderMove::extrusion(Point3::new(1000, 0, 0)));
        feature.append_sequence(sequence, true);
        feature
    }

    fn plan() -> ExtruderPlan {
        ExtruderPlan::new(
            0,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        )
    }

    #[test]
    fn test_back_pressure_compensation() {
        let mut plan = plan();
        plan.append_feature(wall_feature(0.5), true);
        plan.apply_back_pressure_compensation(1.0);

        // Half-width line at full compensation doubles the speed factor.
        let factor = plan.features()[0].speed_back_pressure_factor();
        assert!((factor - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_back_pressure_skips_travel() {
        let mut plan = plan();
        let route = FeatureExtrusion::travel_route(
            PrintFeatureType::MoveRetraction,
            &SpeedDerivatives::default(),
        );
        plan.append_feature(route, false);
        plan.apply_back_pressure_compensation(1.0);
        assert!((plan.features()[0].speed_back_pressure_factor() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_back_pressure_floor() {
        let mut plan = plan();
        // A much wider-than-nominal line with strong compensation would
        // drive the factor negative without the floor.
        plan.append_feature(wall_feature(100.0), true);
        plan.apply_back_pressure_compensation(1.5);
        let factor = plan.features()[0].speed_back_pressure_factor();
        assert!(factor >= 0.001);
    }

    #[test]
    fn test_find_by_extruder_nr() {
        let mut plans = vec![plan()];
        plans.push(ExtruderPlan::new(
            1,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        ));
        assert_eq!(
            ExtruderPlan::for_extruder(&mut plans, 1).unwrap().extruder_nr(),
            1
        );
        assert!(ExtruderPlan::for_extruder(&mut plans, 7).is_none());
    }

    #[test]
    fn test_empty_feature_dropped() {
        let mut plan = plan();
        let config = PathConfig::new(PrintFeatureType::InnerWall, 400, 200, 40.0);
        plan.append_feature(FeatureExtrusion::wall(config, None, 1), true);
        assert!(plan.is_empty());
    }
}
