//! Edit kinds
//!
//! Every editing operation is one variant of the closed [`EditKind`] union,
//! carrying its own observations. What an edit may do is described by its
//! [`Capabilities`] entry rather than by a type hierarchy.

use crate::types::{EditSequence, FeatureId};
use crate::fields::Field;
use cadastre_geom::{Leg, ObservedSpan, Position};
use serde::{Deserialize, Serialize};

/// A direction observed from a point feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    /// Point the direction is observed from
    pub from: FeatureId,
    /// Bearing clockwise from grid north, radians
    pub bearing: f64,
    /// Parallel offset to the right, metres
    #[serde(default)]
    pub offset: f64,
}

impl Direction {
    /// Direction with no offset
    #[inline]
    #[must_use]
    pub const fn new(from: FeatureId, bearing: f64) -> Self {
        Self {
            from,
            bearing,
            offset: 0.0,
        }
    }
}

/// A ground distance observed from a centre point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleObservation {
    /// Centre point
    pub center: FeatureId,
    /// Observed ground distance, metres
    pub distance: f64,
}

impl CircleObservation {
    /// Create an observation
    #[inline]
    #[must_use]
    pub const fn new(center: FeatureId, distance: f64) -> Self {
        Self { center, distance }
    }
}

/// Where a text label sits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextAnchor {
    /// Fixed position
    Fixed {
        /// Label position
        position: Position,
    },
    /// Follows a point feature
    Point {
        /// The point
        point: FeatureId,
    },
}

/// The closed set of editing operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditKind {
    /// Add a point at a known position
    NewPoint {
        /// Where
        position: Position,
    },

    /// Add a line between two points, an arc when `center` is given
    NewLine {
        /// Start point
        start: FeatureId,
        /// End point
        end: FeatureId,
        /// Arc centre point
        #[serde(default)]
        center: Option<FeatureId>,
        /// Arc direction
        #[serde(default)]
        clockwise: bool,
    },

    /// Point at a bearing and distance from another point (sideshot)
    Radial {
        /// Observed direction
        direction: Direction,
        /// Observed ground distance
        distance: f64,
        /// Also add a line from the origin to the new point
        #[serde(default)]
        add_line: bool,
    },

    /// Intersection of two directions
    IntersectDirections {
        /// First direction
        a: Direction,
        /// Second direction
        b: Direction,
        /// Also add lines from each origin to the intersection
        #[serde(default)]
        add_lines: bool,
    },

    /// Intersection of two distances
    IntersectDistances {
        /// First distance
        a: CircleObservation,
        /// Second distance
        b: CircleObservation,
        /// Take the default root rather than the alternate one
        use_default: bool,
        /// Also add lines from each centre to the intersection
        #[serde(default)]
        add_lines: bool,
    },

    /// Intersection of a direction with a distance
    IntersectDirectionAndDistance {
        /// Observed direction
        direction: Direction,
        /// Observed distance
        circle: CircleObservation,
        /// Take the default root rather than the alternate one
        use_default: bool,
    },

    /// Intersection of a direction with an existing line
    IntersectDirectionAndLine {
        /// Observed direction
        direction: Direction,
        /// Line to intersect
        line: FeatureId,
        /// Pick the crossing nearest this position
        #[serde(default)]
        close_to: Option<Position>,
        /// Split the line at the intersection
        split: bool,
    },

    /// Intersection of two existing lines
    IntersectLines {
        /// First line
        a: FeatureId,
        /// Second line
        b: FeatureId,
        /// Pick the crossing nearest this position
        #[serde(default)]
        close_to: Option<Position>,
        /// Split the first line at the intersection
        split_a: bool,
        /// Split the second line at the intersection
        split_b: bool,
    },

    /// Connection path between two known points
    Path {
        /// Start point
        from: FeatureId,
        /// End point
        to: FeatureId,
        /// Observed legs
        legs: Vec<Leg>,
    },

    /// Split a line at one observed distance
    SimpleLineSubdivision {
        /// Line to split
        line: FeatureId,
        /// Ground distance from the start, or from the end when negative
        distance: f64,
    },

    /// Split a line into several observed spans
    LineSubdivision {
        /// Line to split
        line: FeatureId,
        /// Observed spans, start to end
        spans: Vec<ObservedSpan>,
    },

    /// Point on a line at a fraction of its length
    AttachPoint {
        /// Line the point sits on
        line: FeatureId,
        /// Fraction of the line length from its start, 0 to 1
        position_ratio: f64,
        /// Split the line at the point
        #[serde(default)]
        split: bool,
    },

    /// Extend a line past one of its ends by an observed distance
    LineExtension {
        /// Line to extend
        line: FeatureId,
        /// Extend past the end point rather than the start
        from_end: bool,
        /// Observed ground distance
        distance: f64,
        /// Also add the extension as a line
        #[serde(default)]
        add_line: bool,
    },

    /// Add a text label
    NewText {
        /// Label content
        text: String,
        /// Label position
        anchor: TextAnchor,
    },

    /// Move a text label, replacing it with a copy at the new position
    MoveText {
        /// Label being moved
        text: FeatureId,
        /// New label position
        position: Position,
    },

    /// Add a polygon bounded by a closed chain of lines
    NewPolygon {
        /// Boundary lines, in any order
        boundary: Vec<FeatureId>,
    },

    /// Mark lines as trimmed
    TrimLines {
        /// Lines to mark
        lines: Vec<FeatureId>,
    },

    /// Deactivate features
    Deletion {
        /// Features to remove from the map
        features: Vec<FeatureId>,
    },

    /// Correction of an earlier edit
    Update {
        /// Edit being corrected
        target: EditSequence,
        /// New field values
        changes: Vec<Field>,
    },
}

/// What an edit kind can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Persistence tag
    pub tag: &'static str,
    /// Human readable name
    pub name: &'static str,
    /// Can be corrected through an update
    pub revisable: bool,
    /// May split existing lines
    pub splits_lines: bool,
    /// Creates new features
    pub creates_features: bool,
}

const fn caps(
    tag: &'static str,
    name: &'static str,
    revisable: bool,
    splits_lines: bool,
    creates_features: bool,
) -> Capabilities {
    Capabilities {
        tag,
        name,
        revisable,
        splits_lines,
        creates_features,
    }
}

/// Capability table, one row per edit kind
pub const CAPABILITIES: [Capabilities; 19] = [
    caps("new_point", "New point", true, false, true),
    caps("new_line", "New line", true, false, true),
    caps("radial", "Sideshot", true, false, true),
    caps("intersect_directions", "Intersect two directions", true, false, true),
    caps("intersect_distances", "Intersect two distances", true, false, true),
    caps(
        "intersect_direction_and_distance",
        "Intersect direction and distance",
        true,
        false,
        true,
    ),
    caps("intersect_direction_and_line", "Intersect direction and line", true, true, true),
    caps("intersect_lines", "Intersect two lines", true, true, true),
    caps("path", "Connection path", true, false, true),
    caps("simple_line_subdivision", "Split line", true, true, true),
    caps("line_subdivision", "Subdivide line", true, true, true),
    caps("attach_point", "Attach point", true, true, true),
    caps("line_extension", "Extend line", true, false, true),
    caps("new_text", "New text", true, false, true),
    caps("move_text", "Move text", true, false, true),
    caps("new_polygon", "New polygon", false, false, true),
    caps("trim_lines", "Trim lines", false, false, false),
    caps("deletion", "Delete features", false, false, false),
    caps("update", "Update", false, false, false),
];

impl EditKind {
    /// Capability row for this kind
    #[must_use]
    pub fn capabilities(&self) -> &'static Capabilities {
        let row = match self {
            Self::NewPoint { .. } => 0,
            Self::NewLine { .. } => 1,
            Self::Radial { .. } => 2,
            Self::IntersectDirections { .. } => 3,
            Self::IntersectDistances { .. } => 4,
            Self::IntersectDirectionAndDistance { .. } => 5,
            Self::IntersectDirectionAndLine { .. } => 6,
            Self::IntersectLines { .. } => 7,
            Self::Path { .. } => 8,
            Self::SimpleLineSubdivision { .. } => 9,
            Self::LineSubdivision { .. } => 10,
            Self::AttachPoint { .. } => 11,
            Self::LineExtension { .. } => 12,
            Self::NewText { .. } => 13,
            Self::MoveText { .. } => 14,
            Self::NewPolygon { .. } => 15,
            Self::TrimLines { .. } => 16,
            Self::Deletion { .. } => 17,
            Self::Update { .. } => 18,
        };
        &CAPABILITIES[row]
    }

    /// Persistence tag
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.capabilities().tag
    }

    /// Display name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.capabilities().name
    }

    /// Pre-existing features this edit consumes, without duplicates
    #[must_use]
    pub fn required_features(&self) -> Vec<FeatureId> {
        let mut ids = match self {
            Self::NewPoint { .. } | Self::Update { .. } => Vec::new(),
            Self::NewLine { start, end, center, .. } => {
                let mut v = vec![*start, *end];
                v.extend(center.iter().copied());
                v
            }
            Self::Radial { direction, .. } => vec![direction.from],
            Self::IntersectDirections { a, b, .. } => vec![a.from, b.from],
            Self::IntersectDistances { a, b, .. } => vec![a.center, b.center],
            Self::IntersectDirectionAndDistance { direction, circle, .. } => {
                vec![direction.from, circle.center]
            }
            Self::IntersectDirectionAndLine { direction, line, .. } => {
                vec![direction.from, *line]
            }
            Self::IntersectLines { a, b, .. } => vec![*a, *b],
            Self::Path { from, to, .. } => vec![*from, *to],
            Self::SimpleLineSubdivision { line, .. }
            | Self::LineSubdivision { line, .. }
            | Self::AttachPoint { line, .. }
            | Self::LineExtension { line, .. } => vec![*line],
            Self::NewText { anchor, .. } => match anchor {
                TextAnchor::Fixed { .. } => Vec::new(),
                TextAnchor::Point { point } => vec![*point],
            },
            Self::MoveText { text, .. } => vec![*text],
            Self::NewPolygon { boundary } => boundary.clone(),
            Self::TrimLines { lines } => lines.clone(),
            Self::Deletion { features } => features.clone(),
        };
        let mut seen = std::collections::BTreeSet::new();
        ids.retain(|id| seen.insert(*id));
        ids
    }
}
