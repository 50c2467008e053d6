//! Feature-extrusion ordering under pluggable constraints.

use log::warn;

use super::PlanTransformer;
use crate::plan::{ExtruderPlan, FeatureExtrusion};

/// A directed ordering requirement between two features of one extruder
/// plan, by their current indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureOrderingConstraint {
    /// Index of the feature that must be printed first.
    pub before: usize,
    /// Index of the feature that must follow.
    pub after: usize,
}

/// Produces ordering constraints for the features of an extruder plan.
pub trait FeatureOrderingConstraintsGenerator {
    fn append_constraints(
        &self,
        features: &[FeatureExtrusion],
        constraints: &mut Vec<FeatureOrderingConstraint>,
    );
}

/// Orders wall features by their inset index: outer walls before inner
/// walls, or the reverse.
#[derive(Debug, Clone, Copy)]
pub struct InsetOrderConstraintsGenerator {
    /// Print the outer wall before the inner walls.
    pub outer_first: bool,
}

impl FeatureOrderingConstraintsGenerator for InsetOrderConstraintsGenerator {
    fn append_constraints(
        &self,
        features: &[FeatureExtrusion],
        constraints: &mut Vec<FeatureOrderingConstraint>,
    ) {
        for (i, first) in features.iter().enumerate() {
            let Some(inset_i) = first.inset_index() else {
                continue;
            };
            for (j, second) in features.iter().enumerate().skip(i + 1) {
                let Some(inset_j) = second.inset_index() else {
                    continue;
                };
                if inset_i == inset_j {
                    continue;
                }
                let i_first = (inset_i < inset_j) == self.outer_first;
                constraints.push(if i_first {
                    FeatureOrderingConstraint {
                        before: i,
                        after: j,
                    }
                } else {
                    FeatureOrderingConstraint {
                        before: j,
                        after: i,
                    }
                });
            }
        }
    }
}

/// Reorders the features of each extruder plan to satisfy the generated
/// constraints, keeping the current order wherever the constraints allow
/// (stable topological sort). Constraint cycles are logged and the cycle
/// members keep their original order.
#[derive(Default)]
pub struct FeatureReorderer {
    generators: Vec<Box<dyn FeatureOrderingConstraintsGenerator>>,
}

impl FeatureReorderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constraints generator.
    pub fn add_generator(&mut self, generator: Box<dyn FeatureOrderingConstraintsGenerator>) {
        self.generators.push(generator);
    }

    /// Stable topological order of `count` nodes under the constraints.
    fn sorted_order(count: usize, constraints: &[FeatureOrderingConstraint]) -> Vec<usize> {
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut indegree = vec![0usize; count];
        for constraint in constraints {
            if constraint.before >= count || constraint.after >= count {
                continue;
            }
            successors[constraint.before].push(constraint.after);
            indegree[constraint.after] += 1;
        }

        let mut order = Vec::with_capacity(count);
        let mut placed = vec![false; count];
        loop {
            // Lowest-index ready node first keeps the sort stable with
            // respect to the incoming order.
            let next = (0..count).find(|&node| !placed[node] && indegree[node] == 0);
            let Some(node) = next else {
                break;
            };
            placed[node] = true;
            order.push(node);
            for &successor in &successors[node] {
                indegree[successor] -= 1;
            }
        }

        let leftover: Vec<usize> = (0..count).filter(|&node| !placed[node]).collect();
        if !leftover.is_empty() {
            warn!(
                "ordering constraints contain a cycle over features {leftover:?}; keeping their original order"
            );
            order.extend(leftover);
        }
        order
    }
}

impl PlanTransformer for FeatureReorderer {
    fn process_extruder_plan(&mut self, extruder_plan: &mut ExtruderPlan) {
        let mut constraints = Vec::new();
        for generator in &self.generators {
            generator.append_constraints(extruder_plan.features(), &mut constraints);
        }
        if constraints.is_empty() {
            return;
        }

        let features = std::mem::take(extruder_plan.features_mut());
        let order = Self::sorted_order(features.len(), &constraints);

        let mut slots: Vec<Option<FeatureExtrusion>> = features.into_iter().map(Some).collect();
        let reordered: Vec<FeatureExtrusion> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();
        *extruder_plan.features_mut() = reordered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use crate::plan::{
        ContinuousExtruderMoveSequence, ExtruderMove, LayerPlan, PathConfig, PrintFeatureType,
    };
    use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};
    use crate::transform::apply;

    fn wall(inset_index: usize) -> FeatureExtrusion {
        let feature_type = if inset_index == 0 {
            PrintFeatureType::OuterWall
        } else {
            PrintFeatureType::InnerWall
        };
        let config = PathConfig::new(feature_type, 400, 200, 30.0);
        let mut feature = FeatureExtrusion::wall(config, None, inset_index);
        let mut sequence = ContinuousExtruderMoveSequence::new(false, Point3::zero());
        sequence.push_move(ExtruderMove::extrusion(Point3::new(1000, 0, 0)));
        feature.append_sequence(sequence, true);
        feature
    }

    fn layer_with_walls(inset_indices: &[usize]) -> LayerPlan {
        let mut plan = ExtruderPlan::new(
            0,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        );
        for &inset in inset_indices {
            plan.append_feature(wall(inset), true);
        }
        let mut layer = LayerPlan::new(0, 200, 200);
        layer.append_extruder_plan(plan, true);
        layer
    }

    fn inset_order(layer: &LayerPlan) -> Vec<usize> {
        layer
            .extruder_plans()
            .first()
            .map(|plan| {
                plan.features()
                    .iter()
                    .filter_map(|f| f.inset_index())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_outer_first_ordering() {
        let mut layer = layer_with_walls(&[2, 0, 1]);
        let mut reorderer = FeatureReorderer::new();
        reorderer.add_generator(Box::new(InsetOrderConstraintsGenerator { outer_first: true }));
        apply(&mut layer, &mut reorderer);
        assert_eq!(inset_order(&layer), vec![0, 1, 2]);
    }

    #[test]
    fn test_inner_first_ordering() {
        let mut layer = layer_with_walls(&[2, 0, 1]);
        let mut reorderer = FeatureReorderer::new();
        reorderer.add_generator(Box::new(InsetOrderConstraintsGenerator {
            outer_first: false,
        }));
        apply(&mut layer, &mut reorderer);
        assert_eq!(inset_order(&layer), vec![2, 1, 0]);
    }

    #[test]
    fn test_stability_among_equal_insets() {
        // Two inset-1 walls keep their relative order.
        let mut layer = layer_with_walls(&[1, 1, 0]);
        let first_ptr = layer.extruder_plans()[0].features()[0].clone();
        let mut reorderer = FeatureReorderer::new();
        reorderer.add_generator(Box::new(InsetOrderConstraintsGenerator { outer_first: true }));
        apply(&mut layer, &mut reorderer);
        assert_eq!(inset_order(&layer), vec![0, 1, 1]);
        assert_eq!(layer.extruder_plans()[0].features()[1], first_ptr);
    }

    #[test]
    fn test_cycle_keeps_original_order() {
        struct CycleGenerator;
        impl FeatureOrderingConstraintsGenerator for CycleGenerator {
            fn append_constraints(
                &self,
                _features: &[FeatureExtrusion],
                constraints: &mut Vec<FeatureOrderingConstraint>,
            ) {
                constraints.push(FeatureOrderingConstraint {
                    before: 0,
                    after: 1,
                });
                constraints.push(FeatureOrderingConstraint {
                    before: 1,
                    after: 0,
                });
            }
        }

        let mut layer = layer_with_walls(&[2, 1]);
        let before = inset_order(&layer);
        let mut reorderer = FeatureReorderer::new();
        reorderer.add_generator(Box::new(CycleGenerator));
        apply(&mut layer, &mut reorderer);
        assert_eq!(inset_order(&layer), before);
    }

    #[test]
    fn test_no_constraints_is_a_no_op() {
        let mut layer = layer_with_walls(&[]);
        let mut reorderer = FeatureReorderer::new();
        reorderer.add_generator(Box::new(InsetOrderConstraintsGenerator { outer_first: true }));
        apply(&mut layer, &mut reorderer);
        assert!(inset_order(&layer).is_empty());
    }
}
