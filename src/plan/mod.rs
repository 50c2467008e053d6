//! The print-operation tree.
//!
//! A plan is a recursive composite: a [`LayerPlan`] owns [`ExtruderPlan`]s,
//! which own [`FeatureExtrusion`]s, which own
//! [`ContinuousExtruderMoveSequence`]s of [`ExtruderMove`] leaves. Each node
//! exclusively owns its children; the parent chain is threaded explicitly
//! through traversal and emission, so the tree is a forest by construction
//! and re-parenting is a move.
//!
//! Nodes are created during plan building, mutated only by transformer
//! passes (see [`crate::transform`]) and read-only during emission. The
//! uniform search operations on every sequence node are expressed over the
//! borrowed [`OperationRef`] view.

mod extruder;
mod feature;
mod layer;
mod sequence;

pub use extruder::ExtruderPlan;
pub use feature::{FeatureExtrusion, FeatureKind, MeshHandle, PathConfig, PrintFeatureType};
pub use layer::LayerPlan;
pub use sequence::{ContinuousExtruderMoveSequence, ExtruderMove};

/// In which order a search walks a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// Children in insertion order; a node is reported before its subtree.
    Forward,
    /// Children in reverse order; a node is reported before its subtree.
    Backward,
    /// Children in insertion order, recursing into a child's subtree before
    /// reporting the child itself.
    DepthFirst,
}

/// How deep a search descends below the direct children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    /// Only the immediate children.
    DirectChildren,
    /// The whole subtree.
    Full,
    /// At most this many levels below the direct children.
    Limited(usize),
}

impl SearchDepth {
    /// The depth available one level further down, if any.
    fn descend(self) -> Option<SearchDepth> {
        match self {
            SearchDepth::DirectChildren => None,
            SearchDepth::Full => Some(SearchDepth::Full),
            SearchDepth::Limited(0) => None,
            SearchDepth::Limited(n) => Some(SearchDepth::Limited(n - 1)),
        }
    }
}

/// A borrowed view of any node in the operation tree; searches and
/// type-filtered lookups dispatch by matching on it.
#[derive(Debug, Clone, Copy)]
pub enum OperationRef<'a> {
    Layer(&'a LayerPlan),
    Extruder(&'a ExtruderPlan),
    Feature(&'a FeatureExtrusion),
    Sequence(&'a ContinuousExtruderMoveSequence),
    Move(&'a ExtruderMove),
}

impl<'a> OperationRef<'a> {
    /// The referenced extruder plan, if this is one.
    pub fn as_extruder_plan(self) -> Option<&'a ExtruderPlan> {
        match self {
            OperationRef::Extruder(plan) => Some(plan),
            _ => None,
        }
    }

    /// The referenced feature extrusion, if this is one.
    pub fn as_feature(self) -> Option<&'a FeatureExtrusion> {
        match self {
            OperationRef::Feature(feature) => Some(feature),
            _ => None,
        }
    }

    /// The referenced move sequence, if this is one.
    pub fn as_sequence(self) -> Option<&'a ContinuousExtruderMoveSequence> {
        match self {
            OperationRef::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// The referenced move, if this is one.
    pub fn as_move(self) -> Option<&'a ExtruderMove> {
        match self {
            OperationRef::Move(extruder_move) => Some(extruder_move),
            _ => None,
        }
    }
}

/// A node that can appear as a child in the tree.
pub(crate) trait ChildOperation {
    fn as_operation_ref(&self) -> OperationRef<'_>;

    /// Search this node's own children.
    fn find_below(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>>;
}

impl ChildOperation for ExtruderPlan {
    fn as_operation_ref(&self) -> OperationRef<'_> {
        OperationRef::Extruder(self)
    }

    fn find_below(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        find_in_children(self.features(), predicate, order, depth)
    }
}

impl ChildOperation for FeatureExtrusion {
    fn as_operation_ref(&self) -> OperationRef<'_> {
        OperationRef::Feature(self)
    }

    fn find_below(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        find_in_children(self.sequences(), predicate, order, depth)
    }
}

impl ChildOperation for ContinuousExtruderMoveSequence {
    fn as_operation_ref(&self) -> OperationRef<'_> {
        OperationRef::Sequence(self)
    }

    fn find_below(
        &self,
        predicate: &dyn Fn(OperationRef<'_>) -> bool,
        order: SearchOrder,
        depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        find_in_children(self.moves(), predicate, order, depth)
    }
}

impl ChildOperation for ExtruderMove {
    fn as_operation_ref(&self) -> OperationRef<'_> {
        OperationRef::Move(self)
    }

    fn find_below(
        &self,
        _predicate: &dyn Fn(OperationRef<'_>) -> bool,
        _order: SearchOrder,
        _depth: SearchDepth,
    ) -> Option<OperationRef<'_>> {
        None
    }
}

/// The shared search walk: visit children in the requested order, descending
/// as deep as the search depth allows. `DepthFirst` reports a child only
/// after its subtree.
pub(crate) fn find_in_children<'a, C: ChildOperation>(
    children: &'a [C],
    predicate: &dyn Fn(OperationRef<'_>) -> bool,
    order: SearchOrder,
    depth: SearchDepth,
) -> Option<OperationRef<'a>> {
    let mut walk = |child: &'a C| -> Option<OperationRef<'a>> {
        match order {
            SearchOrder::DepthFirst => {
                if let Some(below) = depth.descend() {
                    if let Some(found) = child.find_below(predicate, order, below) {
                        return Some(found);
                    }
                }
                predicate(child.as_operation_ref()).then(|| child.as_operation_ref())
            }
            SearchOrder::Forward | SearchOrder::Backward => {
                if predicate(child.as_operation_ref()) {
                    return Some(child.as_operation_ref());
                }
                depth
                    .descend()
                    .and_then(|below| child.find_below(predicate, order, below))
            }
        }
    };

    if order == SearchOrder::Backward {
        children.iter().rev().find_map(&mut walk)
    } else {
        children.iter().find_map(&mut walk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::PlanExporter;
    use crate::geometry::Point3;
    use crate::settings::{FanSpeedLayerTimeSettings, RetractionConfig, SpeedDerivatives};
    use crate::{Coord, CoordF, LayerIndex};

    fn empty_plan(extruder_nr: usize) -> ExtruderPlan {
        ExtruderPlan::new(
            extruder_nr,
            SpeedDerivatives::default(),
            FanSpeedLayerTimeSettings::default(),
            RetractionConfig::default(),
        )
    }

    fn feature_with_line(
        feature_type: PrintFeatureType,
        inset_index: usize,
        from: (Coord, Coord),
        to: (Coord, Coord),
    ) -> FeatureExtrusion {
        let config = PathConfig::new(feature_type, 400, 200, 30.0);
        let mut feature = FeatureExtrusion::wall(config, None, inset_index);
        let mut sequence =
            ContinuousExtruderMoveSequence::new(false, Point3::new(from.0, from.1, 0));
        sequence.push_move(ExtruderMove::extrusion(Point3::new(to.0, to.1, 0)));
        feature.append_sequence(sequence, true);
        feature
    }

    fn layer_with_two_features() -> LayerPlan {
        let mut layer = LayerPlan::new(2, 600, 200);
        let mut plan = empty_plan(0);
        plan.append_feature(
            feature_with_line(PrintFeatureType::OuterWall, 0, (0, 0), (1000, 0)),
            true,
        );
        plan.append_feature(
            feature_with_line(PrintFeatureType::InnerWall, 1, (2000, 0), (3000, 0)),
            true,
        );
        layer.append_extruder_plan(plan, true);
        layer
    }

    #[test]
    fn test_append_then_remove_restores_sequence() {
        let mut plan = empty_plan(0);
        plan.append_feature(
            feature_with_line(PrintFeatureType::OuterWall, 0, (0, 0), (1000, 0)),
            true,
        );
        let before = plan.features().to_vec();

        let added = feature_with_line(PrintFeatureType::InnerWall, 1, (0, 0), (500, 0));
        plan.append_feature(added.clone(), true);
        assert_eq!(plan.features().len(), 2);

        let removed = plan.features_mut().remove(1);
        assert_eq!(removed, added);
        assert_eq!(plan.features(), &before[..]);
    }

    #[test]
    fn test_find_direct_children_only() {
        let layer = layer_with_two_features();
        // Direct children of the layer are extruder plans; a feature must
        // not be found at depth zero.
        let found = layer.find(
            &|op| matches!(op, OperationRef::Feature(_)),
            SearchOrder::Forward,
            SearchDepth::DirectChildren,
        );
        assert!(found.is_none());

        let found = layer.find(
            &|op| matches!(op, OperationRef::Feature(_)),
            SearchOrder::Forward,
            SearchDepth::Full,
        );
        assert!(found.is_some());
    }

    #[test]
    fn test_find_forward_vs_backward() {
        let layer = layer_with_two_features();
        let first = layer
            .find(
                &|op| matches!(op, OperationRef::Feature(_)),
                SearchOrder::Forward,
                SearchDepth::Full,
            )
            .and_then(OperationRef::as_feature)
            .unwrap();
        assert_eq!(first.feature_type(), PrintFeatureType::OuterWall);

        let last = layer
            .find(
                &|op| matches!(op, OperationRef::Feature(_)),
                SearchOrder::Backward,
                SearchDepth::Full,
            )
            .and_then(OperationRef::as_feature)
            .unwrap();
        assert_eq!(last.feature_type(), PrintFeatureType::InnerWall);
    }

    #[test]
    fn test_depth_first_reports_leaves_before_parents() {
        let layer = layer_with_two_features();
        // With a predicate matching everything, DepthFirst must surface a
        // leaf move before any sequence node.
        let found = layer
            .find(&|_| true, SearchOrder::DepthFirst, SearchDepth::Full)
            .unwrap();
        assert!(matches!(found, OperationRef::Move(_)));
    }

    #[test]
    fn test_limited_depth() {
        let layer = layer_with_two_features();
        // Depth 1 below direct children reaches features but not sequences.
        let found = layer.find(
            &|op| matches!(op, OperationRef::Sequence(_)),
            SearchOrder::Forward,
            SearchDepth::Limited(1),
        );
        assert!(found.is_none());
        let found = layer.find(
            &|op| matches!(op, OperationRef::Sequence(_)),
            SearchOrder::Forward,
            SearchDepth::Limited(2),
        );
        assert!(found.is_some());
    }

    #[test]
    fn test_start_end_positions_across_tree() {
        let layer = layer_with_two_features();
        assert_eq!(layer.find_start_position(), Some(Point3::new(0, 0, 0)));
        assert_eq!(layer.find_end_position(), Some(Point3::new(3000, 0, 0)));
    }

    /// Records exporter calls for traversal-order assertions.
    #[derive(Default)]
    struct RecordingExporter {
        pub events: Vec<String>,
    }

    impl PlanExporter for RecordingExporter {
        fn write_layer_start(
            &mut self,
            layer_index: LayerIndex,
            _start_position: Point3,
        ) -> std::io::Result<()> {
            self.events.push(format!("layer_start {layer_index}"));
            Ok(())
        }

        fn write_extrusion(
            &mut self,
            p: Point3,
            _speed: CoordF,
            _extrusion_mm3_per_mm: CoordF,
            _line_width: Coord,
            _line_thickness: Coord,
            _feature: PrintFeatureType,
            _update_extrusion_offset: bool,
        ) -> std::io::Result<()> {
            self.events.push(format!("extrude {} {} {}", p.x, p.y, p.z));
            Ok(())
        }

        fn write_travel(
            &mut self,
            p: Point3,
            _speed: CoordF,
            _feature: PrintFeatureType,
        ) -> std::io::Result<()> {
            self.events.push(format!("travel {} {} {}", p.x, p.y, p.z));
            Ok(())
        }

        fn write_layer_end(
            &mut self,
            layer_index: LayerIndex,
            _z: Coord,
            _thickness: Coord,
        ) -> std::io::Result<()> {
            self.events.push(format!("layer_end {layer_index}"));
            Ok(())
        }
    }

    #[test]
    fn test_write_traversal_order() {
        let layer = layer_with_two_features();
        let mut exporter = RecordingExporter::default();
        layer.write(&mut exporter).unwrap();

        assert_eq!(
            exporter.events,
            vec![
                "layer_start 2".to_string(),
                "extrude 1000 0 600".to_string(), // layer z added
                "extrude 3000 0 600".to_string(),
                "layer_end 2".to_string(),
            ]
        );
    }

    #[test]
    fn test_extrusion_outside_extruding_feature_is_skipped() {
        let mut layer = LayerPlan::new(0, 200, 200);
        let mut plan = empty_plan(0);
        // A travel route erroneously holding an extrusion move.
        let mut route = FeatureExtrusion::travel_route(
            PrintFeatureType::MoveRetraction,
            &SpeedDerivatives::default(),
        );
        let mut sequence = ContinuousExtruderMoveSequence::new(false, Point3::zero());
        sequence.push_move(ExtruderMove::extrusion(Point3::new(1000, 0, 0)));
        sequence.push_move(ExtruderMove::travel(Point3::new(2000, 0, 0)));
        route.append_sequence(sequence, true);
        plan.append_feature(route, true);
        layer.append_extruder_plan(plan, true);

        let mut exporter = RecordingExporter::default();
        layer.write(&mut exporter).unwrap();

        // The stray extrusion is skipped, the travel still goes out.
        assert_eq!(
            exporter.events,
            vec![
                "layer_start 0".to_string(),
                "travel 2000 0 200".to_string(),
                "layer_end 0".to_string(),
            ]
        );
    }
}
