//! Extrusion lines: variable-width polylines.

use super::junction::ExtrusionJunction;
use crate::geometry::{Point, Polygon};
use crate::{Coord, CoordF};

/// A variable-width extrusion line (polyline with a width at each vertex).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtrusionLine {
    /// The junctions (vertices with width) along this path.
    pub junctions: Vec<ExtrusionJunction>,

    /// Which inset this line belongs to, counted from the outer boundary
    /// inward (0 = outer wall).
    pub inset_index: usize,

    /// Whether this path forms a closed loop.
    pub is_closed: bool,
}

impl ExtrusionLine {
    /// Create an empty line for the given inset.
    pub fn new(inset_index: usize, is_closed: bool) -> Self {
        Self {
            junctions: Vec::new(),
            inset_index,
            is_closed,
        }
    }

    /// Create a line from junctions.
    pub fn from_junctions(
        junctions: Vec<ExtrusionJunction>,
        inset_index: usize,
        is_closed: bool,
    ) -> Self {
        Self {
            junctions,
            inset_index,
            is_closed,
        }
    }

    /// Create a closed constant-width line from a polygon.
    pub fn from_polygon(polygon: &Polygon, width: Coord, inset_index: usize) -> Self {
        let junctions = polygon
            .points()
            .iter()
            .map(|&p| ExtrusionJunction::new(p, width))
            .collect();
        Self {
            junctions,
            inset_index,
            is_closed: true,
        }
    }

    /// Append a junction.
    pub fn add(&mut self, junction: ExtrusionJunction) {
        self.junctions.push(junction);
    }

    /// Number of junctions.
    pub fn len(&self) -> usize {
        self.junctions.len()
    }

    /// True if the line has no junctions.
    pub fn is_empty(&self) -> bool {
        self.junctions.is_empty()
    }

    /// The first junction.
    pub fn front(&self) -> Option<&ExtrusionJunction> {
        self.junctions.first()
    }

    /// The last junction.
    pub fn back(&self) -> Option<&ExtrusionJunction> {
        self.junctions.last()
    }

    /// Classify this line by its first junction: zero width means the line
    /// is a contour, anything else (including an empty line) a tool path.
    pub fn is_contour(&self) -> bool {
        match self.junctions.first() {
            Some(junction) => junction.is_contour(),
            None => false,
        }
    }

    /// Path length over the stored junctions, in scaled units. The closing
    /// segment of a closed line is included only when its end junctions
    /// differ.
    pub fn length(&self) -> CoordF {
        if self.junctions.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for pair in self.junctions.windows(2) {
            total += pair[0].p.distance(&pair[1].p);
        }
        if self.is_closed {
            let first = self.junctions[0].p;
            let last = self.junctions[self.junctions.len() - 1].p;
            total += last.distance(&first);
        }
        total
    }

    /// The centerline as a polygon (junction positions, widths dropped).
    pub fn to_polygon(&self) -> Polygon {
        Polygon::from_points(self.junctions.iter().map(|j| j.p).collect())
    }

    /// The junction positions.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.junctions.iter().map(|j| j.p)
    }
}

/// The extrusion lines of one inset level.
pub type VariableWidthLines = Vec<ExtrusionLine>;

/// Per-inset groupings of extrusion lines, outer inset first.
pub type VariableWidthPaths = Vec<VariableWidthLines>;
