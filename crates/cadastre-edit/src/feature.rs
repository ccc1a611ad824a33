//! Spatial features
//!
//! A feature is created without geometry by the operation that owns it, then
//! given geometry once the operation's construction has been solved. It is
//! moved in place during rollforward and tombstoned, never removed, on undo.

use crate::types::{EditSequence, EntityType, FeatureId, FeatureKind};
use cadastre_geom::{LineGeometry, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Activity state of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureState {
    /// Part of the current map
    Active,
    /// Tombstone kept for undo, redo and predecessor lookup
    Inactive,
}

/// Resolved geometry of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureGeometry {
    /// Point position
    Point {
        /// Where the point is
        position: Position,
    },
    /// Line between two point features
    Line {
        /// Start point feature
        start: FeatureId,
        /// End point feature
        end: FeatureId,
        /// Straight or arc shape
        shape: LineGeometry,
    },
    /// Text label
    Text {
        /// Reference position of the text
        position: Position,
        /// The text itself
        text: String,
    },
    /// Polygon ring
    Polygon {
        /// Boundary vertices in order
        ring: Vec<Position>,
        /// Enclosed area in square metres
        area: f64,
    },
}

impl FeatureGeometry {
    /// Kind of feature this geometry belongs to
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        match self {
            Self::Point { .. } => FeatureKind::Point,
            Self::Line { .. } => FeatureKind::Line,
            Self::Text { .. } => FeatureKind::Text,
            Self::Polygon { .. } => FeatureKind::Polygon,
        }
    }

    /// A representative position (label point)
    #[must_use]
    pub fn anchor(&self) -> Option<Position> {
        match self {
            Self::Point { position } | Self::Text { position, .. } => Some(*position),
            Self::Line { shape, .. } => Some(shape.start().midpoint(&shape.end())),
            Self::Polygon { ring, .. } => cadastre_geom::centroid(ring),
        }
    }
}

/// A spatial feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    id: FeatureId,
    kind: FeatureKind,
    creator: EditSequence,
    /// Classification tag
    pub entity: EntityType,
    /// User-perceived key
    pub key: Option<String>,
    pub(crate) geometry: Option<FeatureGeometry>,
    pub(crate) state: FeatureState,
    pub(crate) moved: bool,
    pub(crate) trimmed: bool,
    pub(crate) dependents: BTreeSet<EditSequence>,
}

impl Feature {
    /// Create a geometry-less feature owned by `creator`
    #[must_use]
    pub fn new(
        id: FeatureId,
        kind: FeatureKind,
        entity: EntityType,
        creator: EditSequence,
    ) -> Self {
        Self {
            id,
            kind,
            creator,
            entity,
            key: None,
            geometry: None,
            state: FeatureState::Active,
            moved: false,
            trimmed: false,
            dependents: BTreeSet::new(),
        }
    }

    /// Feature id
    #[inline]
    #[must_use]
    pub fn id(&self) -> FeatureId {
        self.id
    }

    /// Feature kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    /// The operation that created this feature
    #[inline]
    #[must_use]
    pub fn creator(&self) -> EditSequence {
        self.creator
    }

    /// Geometry, once calculated
    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Option<&FeatureGeometry> {
        self.geometry.as_ref()
    }

    /// Activity state
    #[inline]
    #[must_use]
    pub fn state(&self) -> FeatureState {
        self.state
    }

    /// Is the feature part of the current map?
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == FeatureState::Active
    }

    /// Has rollforward moved this feature since the flag was last cleared?
    #[inline]
    #[must_use]
    pub fn is_moved(&self) -> bool {
        self.moved
    }

    /// Has a trim edit marked this line?
    #[inline]
    #[must_use]
    pub fn is_trimmed(&self) -> bool {
        self.trimmed
    }

    /// Operations that use this feature as an input
    #[inline]
    #[must_use]
    pub fn dependents(&self) -> &BTreeSet<EditSequence> {
        &self.dependents
    }

    /// Point position, if this is a point with geometry
    #[must_use]
    pub fn position(&self) -> Option<Position> {
        match &self.geometry {
            Some(FeatureGeometry::Point { position }) => Some(*position),
            _ => None,
        }
    }

    /// Line shape and end points, if this is a line with geometry
    #[must_use]
    pub fn line(&self) -> Option<(FeatureId, FeatureId, &LineGeometry)> {
        match &self.geometry {
            Some(FeatureGeometry::Line { start, end, shape }) => Some((*start, *end, shape)),
            _ => None,
        }
    }

    /// Position and content of a text feature
    #[must_use]
    pub fn text(&self) -> Option<(Position, &str)> {
        match &self.geometry {
            Some(FeatureGeometry::Text { position, text }) => Some((*position, text.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_geom::Segment;

    #[test]
    fn new_feature_has_no_geometry() {
        let f = Feature::new(
            FeatureId(1),
            FeatureKind::Point,
            EntityType::new("point"),
            EditSequence(1),
        );
        assert!(f.geometry().is_none());
        assert!(f.is_active());
        assert!(f.dependents().is_empty());
        assert_eq!(f.position(), None);
    }

    #[test]
    fn line_anchor_is_midpoint() {
        let g = FeatureGeometry::Line {
            start: FeatureId(1),
            end: FeatureId(2),
            shape: LineGeometry::Segment(Segment::new(
                Position::new(0.0, 0.0),
                Position::new(10.0, 0.0),
            )),
        };
        assert_eq!(g.kind(), FeatureKind::Line);
        assert_eq!(g.anchor(), Some(Position::new(5.0, 0.0)));
    }
}
