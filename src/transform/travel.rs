//! Travel-move insertion between feature extrusions.

use super::PlanTransformer;
use crate::geometry::Point3;
use crate::plan::{
    ContinuousExtruderMoveSequence, ExtruderMove, ExtruderPlan, FeatureExtrusion,
    PrintFeatureType,
};
use crate::settings::SpeedDerivatives;

/// Produces a travel route from one position to another.
///
/// The direct implementation flies straight; collision-avoiding generators
/// (combing around walls, avoiding supports) plug in through this trait.
pub trait TravelMoveGenerator {
    fn generate_route(
        &self,
        start: Point3,
        end: Point3,
        speed: &SpeedDerivatives,
    ) -> FeatureExtrusion;
}

/// Travels in a single straight move.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectTravelMoveGenerator;

impl TravelMoveGenerator for DirectTravelMoveGenerator {
    fn generate_route(
        &self,
        start: Point3,
        end: Point3,
        speed: &SpeedDerivatives,
    ) -> FeatureExtrusion {
        let mut route = FeatureExtrusion::travel_route(PrintFeatureType::MoveRetraction, speed);
        let mut sequence = ContinuousExtruderMoveSequence::new(false, start);
        sequence.push_move(ExtruderMove::travel(end));
        route.append_sequence(sequence, false);
        route
    }
}

/// Inserts a travel route between every pair of adjacent features whose
/// endpoints do not meet. Already-connected pairs are left alone, so the
/// pass is idempotent.
pub struct TravelMoveInserter<G: TravelMoveGenerator = DirectTravelMoveGenerator> {
    generator: G,
}

impl TravelMoveInserter<DirectTravelMoveGenerator> {
    /// Inserter with straight-line travels.
    pub fn direct() -> Self {
        Self {
            generator: DirectTravelMoveGenerator,
        }
    }
}

impl<G: TravelMoveGenerator> TravelMoveInserter<G> {
    /// Inserter with a custom route generator.
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

impl<G: TravelMoveGenerator> PlanTransformer for TravelMoveInserter<G> {
    fn process_extruder_plan(&mut self, extruder_plan: &mut ExtruderPlan) {
        let travel_speed = *extruder_plan.travel_speed();
        let features = std::mem::take(extruder_plan.features_mut());

        let mut connected: Vec<FeatureExtrusion> = Vec::with_capacity(features.len());
        let mut previous_end: Option<Point3> = None;
        for feature in features {
            if let (Some(end), Some(start)) = (previous_end, feature.find_start_position()) {
                if end != start {
                    connected.push(self.generator.generate_route(end, start, &travel_speed));
                }
            }
            previous_end = feature.find_end_position().or(previous_end);
            connected.push(feature);
        }

        *extruder_plan.features_mut() = connected;
    }
}
