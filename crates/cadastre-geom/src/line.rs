//! Line geometry: straight segments and circular arcs
//!
//! Provides [`LineGeometry`], the shape of a line feature once its end
//! points have been resolved, along with the measurement and splitting
//! primitives the editing engine needs.

use crate::error::GeomError;
use crate::position::{clockwise_sweep, Position, TINY};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// A straight segment between two positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start of the segment
    pub start: Position,
    /// End of the segment
    pub end: Position,
}

impl Segment {
    /// Create a new segment
    #[inline]
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Segment length
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// Bearing from start to end
    #[inline]
    #[must_use]
    pub fn bearing(&self) -> f64 {
        self.start.bearing_to(&self.end)
    }

    /// Position at `distance` from the start (not clamped)
    #[must_use]
    pub fn position_at(&self, distance: f64) -> Position {
        self.start.polar(self.bearing(), distance)
    }

    /// Signed distance of the projection of `p` along the segment
    #[must_use]
    pub fn distance_along(&self, p: &Position) -> f64 {
        let len = self.length();
        if len < TINY {
            return 0.0;
        }
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        ((p.x - self.start.x) * dx + (p.y - self.start.y) * dy) / len
    }

    /// Perpendicular offset of `p` from the infinite line (positive to the right)
    #[must_use]
    pub fn offset(&self, p: &Position) -> f64 {
        let len = self.length();
        if len < TINY {
            return self.start.distance(p);
        }
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        ((p.x - self.start.x) * dy - (p.y - self.start.y) * dx) / len
    }

    /// Does `p` lie on the segment within `tolerance`?
    #[must_use]
    pub fn contains(&self, p: &Position, tolerance: f64) -> bool {
        let along = self.distance_along(p);
        self.offset(p).abs() <= tolerance
            && along >= -tolerance
            && along <= self.length() + tolerance
    }
}

/// A circular arc between two positions on a circle
///
/// The arc runs from `start` to `end`, clockwise when `clockwise` is set.
/// A zero sweep (coincident ends) denotes a full circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    /// Centre of the circle the arc lies on
    pub center: Position,
    /// Radius of the circle
    pub radius: f64,
    /// Start of the arc
    pub start: Position,
    /// End of the arc
    pub end: Position,
    /// Direction of travel from start to end
    pub clockwise: bool,
}

impl Arc {
    /// Create a new arc, checking the radius
    ///
    /// # Errors
    /// Returns error if the radius is not positive
    pub fn new(
        center: Position,
        radius: f64,
        start: Position,
        end: Position,
        clockwise: bool,
    ) -> Result<Self, GeomError> {
        if radius.is_nan() || radius <= TINY {
            return Err(GeomError::InvalidRadius(radius));
        }
        Ok(Self {
            center,
            radius,
            start,
            end,
            clockwise,
        })
    }

    /// Bearing from the centre to the start
    #[inline]
    #[must_use]
    pub fn start_bearing(&self) -> f64 {
        self.center.bearing_to(&self.start)
    }

    /// Angular sweep from start to `p`, measured in the arc's direction
    #[must_use]
    pub fn sweep_to(&self, p: &Position) -> f64 {
        let s = self.start_bearing();
        let b = self.center.bearing_to(p);
        if self.clockwise {
            clockwise_sweep(s, b)
        } else {
            clockwise_sweep(b, s)
        }
    }

    /// Total angular sweep of the arc
    #[must_use]
    pub fn sweep(&self) -> f64 {
        let sweep = self.sweep_to(&self.end);
        if sweep < TINY {
            TAU
        } else {
            sweep
        }
    }

    /// Arc length
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        self.radius * self.sweep()
    }

    /// Position at arc `distance` from the start
    #[must_use]
    pub fn position_at(&self, distance: f64) -> Position {
        let angle = distance / self.radius;
        let bearing = if self.clockwise {
            self.start_bearing() + angle
        } else {
            self.start_bearing() - angle
        };
        self.center.polar(bearing, self.radius)
    }

    /// Arc distance from the start to the point on the arc nearest `p`
    #[inline]
    #[must_use]
    pub fn distance_along(&self, p: &Position) -> f64 {
        self.sweep_to(p) * self.radius
    }

    /// Does `p` lie on the arc within `tolerance`?
    #[must_use]
    pub fn contains(&self, p: &Position, tolerance: f64) -> bool {
        if (self.center.distance(p) - self.radius).abs() > tolerance {
            return false;
        }
        if p.is_coincident(&self.start, tolerance) || p.is_coincident(&self.end, tolerance) {
            return true;
        }
        self.sweep_to(p) <= self.sweep()
    }
}

/// The resolved shape of a line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineGeometry {
    /// Straight line
    Segment(Segment),
    /// Circular arc
    Arc(Arc),
}

impl LineGeometry {
    /// Start position
    #[inline]
    #[must_use]
    pub fn start(&self) -> Position {
        match self {
            Self::Segment(s) => s.start,
            Self::Arc(a) => a.start,
        }
    }

    /// End position
    #[inline]
    #[must_use]
    pub fn end(&self) -> Position {
        match self {
            Self::Segment(s) => s.end,
            Self::Arc(a) => a.end,
        }
    }

    /// Length of the line
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        match self {
            Self::Segment(s) => s.length(),
            Self::Arc(a) => a.length(),
        }
    }

    /// Position at `distance` from the start
    ///
    /// # Errors
    /// Returns error if `distance` is outside `[0, length]`
    pub fn position_at(&self, distance: f64) -> Result<Position, GeomError> {
        let length = self.length();
        if distance < 0.0 || distance > length {
            return Err(GeomError::SplitOutsideLine { distance, length });
        }
        Ok(match self {
            Self::Segment(s) => s.position_at(distance),
            Self::Arc(a) => a.position_at(distance),
        })
    }

    /// Distance along the line to the point nearest `p`
    #[must_use]
    pub fn distance_along(&self, p: &Position) -> f64 {
        match self {
            Self::Segment(s) => s.distance_along(p),
            Self::Arc(a) => a.distance_along(p),
        }
    }

    /// Does `p` lie on the line within `tolerance`?
    #[must_use]
    pub fn contains(&self, p: &Position, tolerance: f64) -> bool {
        match self {
            Self::Segment(s) => s.contains(p, tolerance),
            Self::Arc(a) => a.contains(p, tolerance),
        }
    }

    /// Does `p` lie on the line and away from both end points?
    #[must_use]
    pub fn is_interior(&self, p: &Position, tolerance: f64) -> bool {
        self.contains(p, tolerance)
            && !p.is_coincident(&self.start(), tolerance)
            && !p.is_coincident(&self.end(), tolerance)
    }

    /// Same shape with different end points (the sub-section of a split)
    #[must_use]
    pub fn with_ends(&self, start: Position, end: Position) -> LineGeometry {
        match self {
            Self::Segment(_) => Self::Segment(Segment::new(start, end)),
            Self::Arc(a) => Self::Arc(Arc { start, end, ..*a }),
        }
    }

    /// Split the line at an interior position
    ///
    /// # Errors
    /// Returns error if `at` is not strictly inside the line
    pub fn split_at(
        &self,
        at: Position,
        tolerance: f64,
    ) -> Result<(LineGeometry, LineGeometry), GeomError> {
        if !self.is_interior(&at, tolerance) {
            return Err(GeomError::SplitOutsideLine {
                distance: self.distance_along(&at),
                length: self.length(),
            });
        }
        Ok((
            self.with_ends(self.start(), at),
            self.with_ends(at, self.end()),
        ))
    }

    /// Continuation of the line past one of its ends, `distance` long
    ///
    /// A segment carries on along its bearing and an arc around its circle.
    /// The result starts at the extended end.
    ///
    /// # Errors
    /// Returns error if `distance` is not positive, or an arc would wrap
    /// back onto itself
    pub fn extension(&self, from_end: bool, distance: f64) -> Result<LineGeometry, GeomError> {
        if distance.is_nan() || distance <= TINY {
            return Err(GeomError::NonPositiveDistance(distance));
        }
        let (origin, other) = if from_end {
            (self.end(), self.start())
        } else {
            (self.start(), self.end())
        };
        match self {
            Self::Segment(_) => {
                let to = origin.polar(other.bearing_to(&origin), distance);
                Ok(Self::Segment(Segment::new(origin, to)))
            }
            Self::Arc(a) => {
                let angle = distance / a.radius;
                if angle + a.sweep() >= TAU {
                    return Err(GeomError::ExtensionWraps { distance });
                }
                // carrying on past the end keeps the arc's direction
                let clockwise = a.clockwise == from_end;
                let turn = if clockwise { angle } else { -angle };
                let to = a.center.polar(a.center.bearing_to(&origin) + turn, a.radius);
                Ok(Self::Arc(Arc::new(a.center, a.radius, origin, to, clockwise)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn segment_measures() {
        let s = Segment::new(p(0.0, 0.0), p(10.0, 0.0));
        assert!((s.length() - 10.0).abs() < 1e-12);
        assert!((s.distance_along(&p(4.0, 3.0)) - 4.0).abs() < 1e-12);
        // point north of an eastward line is on the left
        assert!(s.offset(&p(4.0, 3.0)) < 0.0);
        assert!(s.contains(&p(10.0, 0.0), 1e-9));
        assert!(!s.contains(&p(10.1, 0.0), 1e-9));
    }

    #[test]
    fn clockwise_quarter_arc() {
        let a = Arc::new(p(0.0, 0.0), 10.0, p(0.0, 10.0), p(10.0, 0.0), true).unwrap();
        assert!((a.length() - 10.0 * std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        let mid = a.position_at(a.length() / 2.0);
        assert!((mid.x - mid.y).abs() < 1e-9 && mid.x > 0.0);
        assert!(a.contains(&mid, 1e-9));
        assert!(!a.contains(&p(-10.0, 0.0), 1e-9));
    }

    #[test]
    fn counter_clockwise_arc_takes_long_way() {
        let a = Arc::new(p(0.0, 0.0), 10.0, p(0.0, 10.0), p(10.0, 0.0), false).unwrap();
        assert!((a.sweep() - 1.5 * std::f64::consts::PI).abs() < 1e-9);
        assert!(a.contains(&p(-10.0, 0.0), 1e-9));
    }

    #[test]
    fn split_segment_interior_only() {
        let g = LineGeometry::Segment(Segment::new(p(0.0, 0.0), p(10.0, 0.0)));
        let (a, b) = g.split_at(p(4.0, 0.0), 1e-6).unwrap();
        assert!((a.length() - 4.0).abs() < 1e-12);
        assert!((b.length() - 6.0).abs() < 1e-12);
        assert!(g.split_at(p(0.0, 0.0), 1e-6).is_err());
        assert!(g.split_at(p(4.0, 1.0), 1e-6).is_err());
    }

    #[test]
    fn segment_extends_along_its_bearing() {
        let g = LineGeometry::Segment(Segment::new(p(0.0, 0.0), p(3.0, 4.0)));
        let past_end = g.extension(true, 5.0).unwrap();
        assert!(past_end.start().is_coincident(&p(3.0, 4.0), 1e-9));
        assert!(past_end.end().is_coincident(&p(6.0, 8.0), 1e-9));
        let before_start = g.extension(false, 5.0).unwrap();
        assert!(before_start.end().is_coincident(&p(-3.0, -4.0), 1e-9));
        assert!(g.extension(true, 0.0).is_err());
    }

    #[test]
    fn arc_extends_around_its_circle() {
        let quarter = Arc::new(p(0.0, 0.0), 10.0, p(0.0, 10.0), p(10.0, 0.0), true).unwrap();
        let g = LineGeometry::Arc(quarter);
        let step = 10.0 * std::f64::consts::FRAC_PI_2;

        let past_end = g.extension(true, step).unwrap();
        assert!(past_end.end().is_coincident(&p(0.0, -10.0), 1e-9));
        assert!((past_end.length() - step).abs() < 1e-9);
        let before_start = g.extension(false, step).unwrap();
        assert!(before_start.end().is_coincident(&p(-10.0, 0.0), 1e-9));
        assert!((before_start.length() - step).abs() < 1e-9);

        assert!(matches!(
            g.extension(true, 3.5 * step),
            Err(GeomError::ExtensionWraps { .. })
        ));
    }

    #[test]
    fn position_at_rejects_overrun() {
        let g = LineGeometry::Segment(Segment::new(p(0.0, 0.0), p(10.0, 0.0)));
        assert!(g.position_at(10.5).is_err());
        assert!(g.position_at(-0.1).is_err());
    }
}
