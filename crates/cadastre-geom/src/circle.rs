//! Circles and circle-circle intersection
//!
//! Two-root results are always returned in canonical order: the root with
//! the smallest clockwise bearing seen from any of the circle centres comes
//! first. That first root is the "default" answer of a construction.

use crate::error::GeomError;
use crate::position::{Position, TINY};
use serde::{Deserialize, Serialize};

/// A circle on the mapping plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Centre position
    pub center: Position,
    /// Radius in metres
    pub radius: f64,
}

impl Circle {
    /// Create a new circle
    ///
    /// # Errors
    /// Returns error if the radius is not positive
    pub fn new(center: Position, radius: f64) -> Result<Self, GeomError> {
        if radius.is_nan() || radius <= TINY {
            return Err(GeomError::NonPositiveDistance(radius));
        }
        Ok(Self { center, radius })
    }

    /// Does `p` lie on the circle within `tolerance`?
    #[inline]
    #[must_use]
    pub fn contains(&self, p: &Position, tolerance: f64) -> bool {
        (self.center.distance(p) - self.radius).abs() <= tolerance
    }
}

/// Intersect two circles
///
/// Returns zero, one (tangent) or two roots; two roots are in canonical
/// order (see [`order_roots`]).
///
/// # Errors
/// Returns error if the circles share a centre
pub fn intersect_circles(a: &Circle, b: &Circle) -> Result<Vec<Position>, GeomError> {
    let dx = b.center.x - a.center.x;
    let dy = b.center.y - a.center.y;
    let distsq = dx * dx + dy * dy;
    if distsq < TINY {
        return Err(GeomError::ConcentricCircles);
    }

    let rsq1 = a.radius * a.radius;
    let rsq2 = b.radius * b.radius;
    let delrsq = rsq2 - rsq1;
    let sumrsq = rsq1 + rsq2;
    let root = 2.0 * sumrsq * distsq - distsq * distsq - delrsq * delrsq;

    // root / (4 * distsq) is the squared half-chord
    let half_chord_sq = root / (4.0 * distsq);
    if half_chord_sq < -TINY {
        return Ok(Vec::new());
    }

    let dstinv = 0.5 / distsq;
    let scl = 0.5 - delrsq * dstinv;
    let x = dx * scl + a.center.x;
    let y = dy * scl + a.center.y;

    if half_chord_sq <= TINY {
        return Ok(vec![Position::new(x, y)]);
    }

    let root = dstinv * root.sqrt();
    let xfac = dx * root;
    let yfac = dy * root;
    let mut roots = vec![
        Position::new(x - yfac, y + xfac),
        Position::new(x + yfac, y - xfac),
    ];
    order_roots(&mut roots, &[a.center, b.center]);
    Ok(roots)
}

/// Put two roots in canonical order
///
/// The root whose minimum clockwise bearing from any of `origins` is lowest
/// comes first. Equal keys keep the solver's order.
pub fn order_roots(roots: &mut [Position], origins: &[Position]) {
    if roots.len() != 2 || origins.is_empty() {
        return;
    }
    let key = |p: &Position| {
        origins
            .iter()
            .map(|o| o.bearing_to(p))
            .fold(f64::INFINITY, f64::min)
    };
    if key(&roots[1]) < key(&roots[0]) {
        roots.swap(0, 1);
    }
}

/// Select the default (first) or alternate (second) root
///
/// A single root is returned whatever `use_default` says.
#[must_use]
pub fn select_root(roots: &[Position], use_default: bool) -> Option<Position> {
    match roots {
        [] => None,
        [only] => Some(*only),
        [first, second, ..] => Some(if use_default { *first } else { *second }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_root_is_north_of_the_chord() {
        let a = Circle::new(Position::new(0.0, 0.0), 5.0).unwrap();
        let b = Circle::new(Position::new(8.0, 0.0), 5.0).unwrap();
        let roots = intersect_circles(&a, &b).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots[0].is_coincident(&Position::new(4.0, 3.0), 1e-12));
        assert!(roots[1].is_coincident(&Position::new(4.0, -3.0), 1e-12));

        // swapping the circles does not change which root is the default
        let swapped = intersect_circles(&b, &a).unwrap();
        assert!(swapped[0].is_coincident(&roots[0], 1e-12));
    }

    #[test]
    fn disjoint_circles_have_no_roots() {
        let a = Circle::new(Position::new(0.0, 0.0), 1.0).unwrap();
        let b = Circle::new(Position::new(8.0, 0.0), 1.0).unwrap();
        assert!(intersect_circles(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn tangent_circles_have_one_root() {
        let a = Circle::new(Position::new(0.0, 0.0), 4.0).unwrap();
        let b = Circle::new(Position::new(8.0, 0.0), 4.0).unwrap();
        let roots = intersect_circles(&a, &b).unwrap();
        assert_eq!(roots.len(), 1);
        assert!(roots[0].is_coincident(&Position::new(4.0, 0.0), 1e-9));
    }

    #[test]
    fn concentric_is_an_error() {
        let a = Circle::new(Position::new(1.0, 1.0), 4.0).unwrap();
        let b = Circle::new(Position::new(1.0, 1.0), 5.0).unwrap();
        assert_eq!(intersect_circles(&a, &b), Err(GeomError::ConcentricCircles));
    }

    #[test]
    fn select_root_honours_default_flag() {
        let roots = [Position::new(1.0, 0.0), Position::new(2.0, 0.0)];
        assert_eq!(select_root(&roots, true), Some(roots[0]));
        assert_eq!(select_root(&roots, false), Some(roots[1]));
        assert_eq!(select_root(&roots[..1], false), Some(roots[0]));
        assert_eq!(select_root(&[], true), None);
    }

    proptest! {
        #[test]
        fn prop_roots_lie_on_both_circles(
            bx in -50.0..50.0f64,
            by in -50.0..50.0f64,
            r1 in 1.0..60.0f64,
            r2 in 1.0..60.0f64,
        ) {
            prop_assume!(bx.hypot(by) > 0.5);
            let a = Circle::new(Position::new(0.0, 0.0), r1).unwrap();
            let b = Circle::new(Position::new(bx, by), r2).unwrap();
            for root in intersect_circles(&a, &b).unwrap() {
                prop_assert!(a.contains(&root, 1e-4));
                prop_assert!(b.contains(&root, 1e-4));
            }
        }
    }
}
