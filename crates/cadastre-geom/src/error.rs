//! Geometry error types
//!
//! Every variant describes a degenerate or impossible construction. These are
//! expected domain outcomes, never bugs.

/// Failure of a geometric construction
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeomError {
    /// A line or leg has no length
    #[error("zero-length line")]
    ZeroLength,

    /// An observed distance is zero or negative
    #[error("observed distance must be positive (got {0})")]
    NonPositiveDistance(f64),

    /// Two circles do not meet
    #[error("circles do not intersect")]
    CirclesDoNotIntersect,

    /// Two circles share a centre
    #[error("circles are concentric")]
    ConcentricCircles,

    /// Two directions are parallel
    #[error("directions are parallel")]
    ParallelDirections,

    /// No crossing was found between the inputs
    #[error("no intersection found")]
    NoIntersection,

    /// A split position is not strictly inside the line
    #[error("split distance {distance} is outside line of length {length}")]
    SplitOutsideLine {
        /// Requested distance along the line
        distance: f64,
        /// Length of the line being split
        length: f64,
    },

    /// A point expected to be on a line or circle is not
    #[error("position is {offset} m away from the line")]
    OffLine {
        /// Perpendicular (or radial) offset from the line
        offset: f64,
    },

    /// Every span of a subdivision is fixed
    #[error("all spans are fixed; nothing to adjust")]
    AllSpansFixed,

    /// A traverse has no legs or spans
    #[error("traverse has no observations")]
    EmptyTraverse,

    /// A traverse start and end coincide
    #[error("traverse start and end coincide")]
    CoincidentTraverseEnds,

    /// Fixed spans keep a traverse from reaching its end point
    #[error("traverse cannot be closed by scaling its free spans")]
    TraverseCannotClose,

    /// A polygon boundary does not close
    #[error("polygon boundary is not closed")]
    OpenBoundary,

    /// An arc extended this far would overlap itself
    #[error("extending an arc by {distance} wraps onto the arc")]
    ExtensionWraps {
        /// Requested extension
        distance: f64,
    },

    /// An arc's radius is invalid
    #[error("invalid radius {0}")]
    InvalidRadius(f64),
}
