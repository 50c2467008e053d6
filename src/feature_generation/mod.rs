//! Feature generators: populating extruder plans from layer geometry.
//!
//! A [`FeatureGenerator`] turns one layer's geometric regions into feature
//! extrusions appended to the right extruder plan. The core ships the wall
//! generator glue; skin, infill and support generators follow the same
//! trait from the application around the core.

use std::sync::Arc;

use log::warn;

use crate::pipeline::LayerInput;
use crate::plan::{
    ContinuousExtruderMoveSequence, ExtruderPlan, FeatureExtrusion, MeshHandle, PathConfig,
};
use crate::settings::WallSettings;
use crate::walls;
use crate::{Coord, Result};

/// Produces feature extrusions for one layer.
///
/// Generators are read-only and shared across the layer worker pool.
pub trait FeatureGenerator: Send + Sync {
    /// Whether this generator produces anything under the current settings.
    fn is_active(&self) -> bool;

    /// Generate features for the layer and append them to the matching
    /// extruder plans.
    fn generate_features(
        &self,
        layer: &LayerInput,
        extruder_plans: &mut [ExtruderPlan],
    ) -> Result<()>;
}

/// Converts a layer outline into variable-width wall feature extrusions.
///
/// Each inset level becomes one wall feature whose move sequences carry the
/// junction widths as per-move line width ratios. The residual inner
/// contour is the infill generator's concern and available through
/// [`walls::generate`].
pub struct WallFeatureGenerator {
    extruder_nr: usize,
    bead_width_0: Coord,
    bead_width_x: Coord,
    inset_count: usize,
    settings: WallSettings,
    outer_config: PathConfig,
    inner_config: PathConfig,
    mesh: Option<Arc<MeshHandle>>,
}

impl WallFeatureGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extruder_nr: usize,
        bead_width_0: Coord,
        bead_width_x: Coord,
        inset_count: usize,
        settings: WallSettings,
        outer_config: PathConfig,
        inner_config: PathConfig,
        mesh: Option<Arc<MeshHandle>>,
    ) -> Self {
        Self {
            extruder_nr,
            bead_width_0,
            bead_width_x,
            inset_count,
            settings,
            outer_config,
            inner_config,
            mesh,
        }
    }
}

impl FeatureGenerator for WallFeatureGenerator {
    fn is_active(&self) -> bool {
        self.inset_count > 0
    }

    fn generate_features(
        &self,
        layer: &LayerInput,
        extruder_plans: &mut [ExtruderPlan],
    ) -> Result<()> {
        let (toolpaths, _inner_contour) = walls::generate(
            &layer.outline,
            self.bead_width_0,
            self.bead_width_x,
            self.inset_count,
            &self.settings,
        )?;

        let Some(extruder_plan) = ExtruderPlan::for_extruder(extruder_plans, self.extruder_nr)
        else {
            warn!(
                "no extruder plan for extruder {} on layer {}; walls dropped",
                self.extruder_nr, layer.layer_index
            );
            return Ok(());
        };

        for lines in &toolpaths {
            let Some(inset_index) = lines.first().map(|line| line.inset_index) else {
                continue;
            };
            let config = if inset_index == 0 {
                self.outer_config.clone()
            } else {
                self.inner_config.clone()
            };
            let nominal_width = config.line_width;
            let mut feature = FeatureExtrusion::wall(config, self.mesh.clone(), inset_index);
            for line in lines {
                if let Some(sequence) =
                    ContinuousExtruderMoveSequence::from_extrusion_line(line, nominal_width)
                {
                    feature.append_sequence(sequence, true);
                }
            }
            extruder_plan.append_feature(feature, true);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon, Shape};
    use crate::plan::PrintFeatureType;
    use crate::scale;
    use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};

    fn square_layer(size_mm: f64) -> LayerInput {
        LayerInput {
            layer_index: 0,
            z: 200,
            thickness: 200,
            outline: Shape::from_polygons(vec![Polygon::rectangle(
                Point::new(0, 0),
                Point::new(scale(size_mm), scale(size_mm)),
            )]),
        }
    }

    fn generator(inset_count: usize) -> WallFeatureGenerator {
        WallFeatureGenerator::new(
            0,
            400,
            400,
            inset_count,
            WallSettings::default(),
            PathConfig::new(PrintFeatureType::OuterWall, 400, 200, 25.0),
            PathConfig::new(PrintFeatureType::InnerWall, 400, 200, 40.0),
            Some(MeshHandle::new("cube")),
        )
    }

    fn empty_plans() -> Vec<ExtruderPlan> {
        vec![ExtruderPlan::new(
            0,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        )]
    }

    #[test]
    fn test_walls_become_features() {
        let generator = generator(2);
        assert!(generator.is_active());

        let mut plans = empty_plans();
        generator
            .generate_features(&square_layer(10.0), &mut plans)
            .unwrap();

        let features = plans[0].features();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].inset_index(), Some(0));
        assert_eq!(features[0].feature_type(), PrintFeatureType::OuterWall);
        assert_eq!(features[1].inset_index(), Some(1));
        assert_eq!(features[1].feature_type(), PrintFeatureType::InnerWall);
        assert!(features.iter().all(|f| !f.is_empty()));
        assert_eq!(features[0].mesh().unwrap().name, "cube");

        // Wall sequences are closed chains.
        for feature in features {
            for sequence in feature.sequences() {
                assert!(sequence.is_closed());
                assert_eq!(
                    sequence.find_end_position(),
                    Some(sequence.start_position())
                );
            }
        }
    }

    #[test]
    fn test_inactive_with_zero_insets() {
        assert!(!generator(0).is_active());
    }

    #[test]
    fn test_missing_extruder_plan_is_not_fatal() {
        let generator = WallFeatureGenerator::new(
            3, // no such extruder below
            400,
            400,
            1,
            WallSettings::default(),
            PathConfig::new(PrintFeatureType::OuterWall, 400, 200, 25.0),
            PathConfig::new(PrintFeatureType::InnerWall, 400, 200, 40.0),
            None,
        );
        let mut plans = empty_plans();
        generator
            .generate_features(&square_layer(10.0), &mut plans)
            .unwrap();
        assert!(plans[0].is_empty());
    }
}
