//! Connection-path (traverse) adjustment
//!
//! A path is observed as a sequence of legs from a known start point. The
//! raw observations are projected from due north, the free end is compared
//! with the known end point, and a single rotation plus a single scale factor
//! are derived so that the path closes exactly. The adjusted layout is the
//! raw layout under that similarity transform.

use crate::error::GeomError;
use crate::line::{Arc, LineGeometry, Segment};
use crate::position::{Position, TINY};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Shape of a leg
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LegShape {
    /// Straight leg
    Straight,
    /// Circular arc leg, tangent to the incoming direction
    Arc {
        /// Observed radius
        radius: f64,
        /// Curves to the right when set
        clockwise: bool,
    },
}

/// One observed span of a leg
///
/// `omit_point` leaves no point at the end of the span, so neither this span
/// nor the next one gets a line. `miss_connect` keeps the end point but
/// draws no line along the span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSpan {
    /// Observed distance
    pub length: f64,
    /// Keeps its observed length when the path is closed
    #[serde(default)]
    pub fixed: bool,
    /// No point at the end of the span
    #[serde(default)]
    pub omit_point: bool,
    /// No line along the span
    #[serde(default)]
    pub miss_connect: bool,
}

impl PathSpan {
    /// An adjustable span with a point and a line
    #[must_use]
    pub const fn new(length: f64) -> Self {
        Self {
            length,
            fixed: false,
            omit_point: false,
            miss_connect: false,
        }
    }

    /// Mark as fixed
    #[must_use]
    pub const fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Mark as ending without a point
    #[must_use]
    pub const fn omit_point(mut self) -> Self {
        self.omit_point = true;
        self
    }

    /// Mark as having no line
    #[must_use]
    pub const fn miss_connect(mut self) -> Self {
        self.miss_connect = true;
        self
    }
}

impl From<f64> for PathSpan {
    fn from(length: f64) -> Self {
        Self::new(length)
    }
}

/// One leg of a connection path
///
/// Spans are observed distances along the leg (arc distances for an arc
/// leg). `deflection` turns the direction of travel clockwise before the leg
/// starts; for the first leg it is measured from due north.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Clockwise turn applied before this leg
    pub deflection: f64,
    /// Straight or arc
    pub shape: LegShape,
    /// Observed spans
    pub spans: Vec<PathSpan>,
}

impl Leg {
    /// A straight leg
    #[must_use]
    pub fn straight<S: Into<PathSpan>>(
        deflection: f64,
        spans: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            deflection,
            shape: LegShape::Straight,
            spans: spans.into_iter().map(Into::into).collect(),
        }
    }

    /// An arc leg
    #[must_use]
    pub fn arc<S: Into<PathSpan>>(
        deflection: f64,
        radius: f64,
        clockwise: bool,
        spans: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            deflection,
            shape: LegShape::Arc { radius, clockwise },
            spans: spans.into_iter().map(Into::into).collect(),
        }
    }

    /// Total observed length
    #[must_use]
    pub fn length(&self) -> f64 {
        self.spans.iter().map(|s| s.length).sum()
    }

    fn validate(&self) -> Result<(), GeomError> {
        if let Some(bad) = self.spans.iter().find(|s| s.length.is_nan() || s.length <= 0.0) {
            return Err(GeomError::NonPositiveDistance(bad.length));
        }
        if let LegShape::Arc { radius, .. } = self.shape {
            if radius.is_nan() || radius <= TINY {
                return Err(GeomError::InvalidRadius(radius));
            }
        }
        Ok(())
    }
}

/// Result of closing a path onto its known end point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Misclosure in easting (target minus free end)
    pub misclosure_e: f64,
    /// Misclosure in northing (target minus free end)
    pub misclosure_n: f64,
    /// Total observed length
    pub length: f64,
    /// Uniform rotation applied to every leg (clockwise radians)
    pub rotation: f64,
    /// Scale factor applied to every span that is not fixed
    pub scale: f64,
}

impl Adjustment {
    /// Length of the misclosure vector
    #[must_use]
    pub fn misclosure(&self) -> f64 {
        self.misclosure_e.hypot(self.misclosure_n)
    }

    /// Precision ratio (observed length over misclosure)
    #[must_use]
    pub fn precision(&self) -> f64 {
        let m = self.misclosure();
        if m < TINY {
            f64::INFINITY
        } else {
            self.length / m
        }
    }
}

/// Adjusted layout of a path
#[derive(Debug, Clone, PartialEq)]
pub struct PathLayout {
    /// The closing adjustment
    pub adjustment: Adjustment,
    /// Span geometry, leg by leg
    pub legs: Vec<Vec<LineGeometry>>,
}

impl PathLayout {
    /// End position of every span, in path order
    #[must_use]
    pub fn points(&self) -> Vec<Position> {
        self.legs.iter().flatten().map(LineGeometry::end).collect()
    }

    /// All span geometries, in path order
    pub fn spans(&self) -> impl Iterator<Item = &LineGeometry> {
        self.legs.iter().flatten()
    }
}

/// Lay the legs out from `from`, starting at `bearing` and scaling the
/// length of every span that is not fixed by `scale`
///
/// A scaled arc span has its radius scaled too, so every span turns through
/// the same angle whatever the scale.
///
/// # Errors
/// Returns error if a span or radius is invalid
pub fn project(
    from: &Position,
    bearing: f64,
    scale: f64,
    legs: &[Leg],
) -> Result<Vec<Vec<LineGeometry>>, GeomError> {
    let mut here = *from;
    let mut heading = bearing;
    let mut out = Vec::with_capacity(legs.len());

    for leg in legs {
        leg.validate()?;
        heading += leg.deflection;
        let mut spans = Vec::with_capacity(leg.spans.len());
        for span in &leg.spans {
            let k = if span.fixed { 1.0 } else { scale };
            let length = span.length * k;
            match leg.shape {
                LegShape::Straight => {
                    let next = here.polar(heading, length);
                    spans.push(LineGeometry::Segment(Segment::new(here, next)));
                    here = next;
                }
                LegShape::Arc { radius, clockwise } => {
                    let radius = radius * k;
                    let side = if clockwise { FRAC_PI_2 } else { -FRAC_PI_2 };
                    let center = here.polar(heading + side, radius);
                    let arc = Arc::new(center, radius, here, here, clockwise)?;
                    let next = arc.position_at(length);
                    spans.push(LineGeometry::Arc(Arc { end: next, ..arc }));
                    let turn = length / radius;
                    heading += if clockwise { turn } else { -turn };
                    here = next;
                }
            }
        }
        out.push(spans);
    }
    Ok(out)
}

/// Adjust a path from `from` so that it closes on `to`
///
/// Fixed spans keep their observed length. The scale applied to the other
/// spans solves `|F + sN| = |T|`, where `F` and `N` are the summed chords of
/// the fixed and free spans and `T` runs from `from` to `to`; the rotation
/// then turns `F + sN` onto `T`. Without fixed spans this is a plain
/// similarity transform.
///
/// # Errors
/// Returns error if there are no spans, an observation is invalid, every
/// span is fixed, or the path (observed or known) has no extent or cannot
/// be closed
pub fn adjust(from: &Position, to: &Position, legs: &[Leg]) -> Result<PathLayout, GeomError> {
    if legs.iter().all(|l| l.spans.is_empty()) {
        return Err(GeomError::EmptyTraverse);
    }

    let raw = project(from, 0.0, 1.0, legs)?;
    let spans = legs.iter().flat_map(|l| &l.spans);
    let (mut fixed, mut free) = ((0.0, 0.0), (0.0, 0.0));
    for (span, geometry) in spans.zip(raw.iter().flatten()) {
        let (start, end) = (geometry.start(), geometry.end());
        let sum = if span.fixed { &mut fixed } else { &mut free };
        sum.0 += end.x - start.x;
        sum.1 += end.y - start.y;
    }
    if legs.iter().flat_map(|l| &l.spans).all(|s| s.fixed) {
        return Err(GeomError::AllSpansFixed);
    }

    let free_end = Position::new(from.x + fixed.0 + free.0, from.y + fixed.1 + free.1);
    let want = from.distance(to);
    let nn = free.0 * free.0 + free.1 * free.1;
    if from.distance(&free_end) < TINY || want < TINY || nn < TINY * TINY {
        return Err(GeomError::CoincidentTraverseEnds);
    }

    let b = fixed.0 * free.0 + fixed.1 * free.1;
    let c = fixed.0 * fixed.0 + fixed.1 * fixed.1 - want * want;
    let disc = b * b - nn * c;
    if disc < 0.0 {
        return Err(GeomError::TraverseCannotClose);
    }
    let scale = (disc.sqrt() - b) / nn;
    if scale <= TINY {
        return Err(GeomError::TraverseCannotClose);
    }

    let closed = Position::new(
        from.x + fixed.0 + scale * free.0,
        from.y + fixed.1 + scale * free.1,
    );
    let rotation = from.bearing_to(to) - from.bearing_to(&closed);
    let adjustment = Adjustment {
        misclosure_e: to.x - free_end.x,
        misclosure_n: to.y - free_end.y,
        length: legs.iter().map(Leg::length).sum(),
        rotation,
        scale,
    };

    let mut adjusted = project(from, rotation, scale, legs)?;
    // land the last span exactly on the known end point
    if let Some(last) = adjusted.iter_mut().rev().find_map(|l| l.last_mut()) {
        *last = last.with_ends(last.start(), *to);
    }

    Ok(PathLayout {
        adjustment,
        legs: adjusted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn p(x: f64, y: f64) -> Position {
        Position::new(x, y)
    }

    #[test]
    fn short_path_scales_down() {
        let legs = vec![Leg::straight(0.0, vec![10.0]), Leg::straight(0.0, vec![10.0])];
        let layout = adjust(&p(0.0, 0.0), &p(0.0, 19.0), &legs).unwrap();
        assert!((layout.adjustment.scale - 0.95).abs() < 1e-12);
        assert!(layout.adjustment.rotation.abs() < 1e-12);
        assert!((layout.adjustment.misclosure_n + 1.0).abs() < 1e-12);
        let points = layout.points();
        assert!(points[0].is_coincident(&p(0.0, 9.5), 1e-12));
        assert!(points[1].is_coincident(&p(0.0, 19.0), 1e-12));
    }

    #[test]
    fn rotation_closes_on_target() {
        // observed due north, target due east
        let legs = vec![Leg::straight(0.0, vec![6.0, 4.0])];
        let layout = adjust(&p(100.0, 100.0), &p(110.0, 100.0), &legs).unwrap();
        assert!((layout.adjustment.rotation - PI / 2.0).abs() < 1e-12);
        assert!((layout.adjustment.scale - 1.0).abs() < 1e-12);
        assert!(layout.points()[0].is_coincident(&p(106.0, 100.0), 1e-9));
    }

    #[test]
    fn deflection_turns_subsequent_legs() {
        // north 10 then turn right 90 and go 10: free end at (10, 10)
        let legs = vec![
            Leg::straight(0.0, vec![10.0]),
            Leg::straight(PI / 2.0, vec![10.0]),
        ];
        let layout = adjust(&p(0.0, 0.0), &p(10.0, 10.0), &legs).unwrap();
        assert!(layout.adjustment.misclosure() < 1e-9);
        assert!(layout.points()[0].is_coincident(&p(0.0, 10.0), 1e-9));
    }

    #[test]
    fn arc_leg_curves_right() {
        // quarter circle of radius 10 curving right from due north
        let quarter = 10.0 * PI / 2.0;
        let legs = vec![Leg::arc(0.0, 10.0, true, vec![quarter])];
        let raw = project(&p(0.0, 0.0), 0.0, 1.0, &legs).unwrap();
        let end = raw[0][0].end();
        assert!(end.is_coincident(&p(10.0, 10.0), 1e-9));
        assert!((raw[0][0].length() - quarter).abs() < 1e-9);
    }

    #[test]
    fn fixed_span_keeps_its_length() {
        let spans = [PathSpan::new(10.0).fixed(), PathSpan::new(10.0)];
        let legs = vec![Leg::straight(0.0, spans)];
        let layout = adjust(&p(0.0, 0.0), &p(0.0, 19.0), &legs).unwrap();
        assert!((layout.adjustment.scale - 0.9).abs() < 1e-12);
        assert!(layout.adjustment.rotation.abs() < 1e-12);
        let lengths: Vec<f64> = layout.spans().map(LineGeometry::length).collect();
        assert!((lengths[0] - 10.0).abs() < 1e-9);
        assert!((lengths[1] - 9.0).abs() < 1e-9);
        assert!(layout.points()[0].is_coincident(&p(0.0, 10.0), 1e-9));
    }

    #[test]
    fn fixed_spans_with_a_turn_still_close() {
        // fixed 6 north then a free 8 east; the known end is 52^0.5 away
        let legs = vec![
            Leg::straight(0.0, [PathSpan::new(6.0).fixed()]),
            Leg::straight(PI / 2.0, [8.0]),
        ];
        let origin = p(0.0, 0.0);
        let to = origin.polar(origin.bearing_to(&p(8.0, 6.0)), 52.0_f64.sqrt());
        let layout = adjust(&origin, &to, &legs).unwrap();
        assert!((layout.adjustment.scale - 0.5).abs() < 1e-12);
        let spans: Vec<&LineGeometry> = layout.spans().collect();
        assert!((spans[0].length() - 6.0).abs() < 1e-9);
        assert!((spans[1].length() - 4.0).abs() < 1e-9);
        assert!(spans[1].end().is_coincident(&to, 1e-12));
        assert!(spans[0].end().is_coincident(&spans[1].start(), 1e-9));
    }

    #[test]
    fn all_fixed_or_unreachable_paths_fail() {
        let fixed = vec![Leg::straight(0.0, [PathSpan::new(10.0).fixed()])];
        assert_eq!(
            adjust(&p(0.0, 0.0), &p(0.0, 9.0), &fixed),
            Err(GeomError::AllSpansFixed)
        );
        // 30 m fixed north cannot reach a point 5 m away by scaling a span east
        let legs = vec![
            Leg::straight(0.0, [PathSpan::new(30.0).fixed()]),
            Leg::straight(PI / 2.0, [1.0]),
        ];
        assert_eq!(
            adjust(&p(0.0, 0.0), &p(0.0, 5.0), &legs),
            Err(GeomError::TraverseCannotClose)
        );
    }

    #[test]
    fn empty_and_degenerate_paths_fail() {
        assert_eq!(
            adjust(&p(0.0, 0.0), &p(0.0, 1.0), &[]),
            Err(GeomError::EmptyTraverse)
        );
        let legs = vec![Leg::straight(0.0, vec![10.0])];
        assert_eq!(
            adjust(&p(0.0, 0.0), &p(0.0, 0.0), &legs),
            Err(GeomError::CoincidentTraverseEnds)
        );
        let bad = vec![Leg::straight(0.0, vec![10.0, -1.0])];
        assert_eq!(
            adjust(&p(0.0, 0.0), &p(0.0, 9.0), &bad),
            Err(GeomError::NonPositiveDistance(-1.0))
        );
    }
}
