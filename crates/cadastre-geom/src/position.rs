//! Planar positions and bearing arithmetic
//!
//! Bearings are radians measured clockwise from grid north, normalised to
//! `[0, 2π)`. Positions are easting (`x`) / northing (`y`) in metres.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt::{self, Display, Formatter};

/// Numeric threshold below which a quantity is treated as zero
pub const TINY: f64 = 1.0e-10;

/// Default positional resolution (one micron)
pub const XY_RESOLUTION: f64 = 1.0e-6;

/// A planar position (easting, northing)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Easting in metres
    pub x: f64,
    /// Northing in metres
    pub y: f64,
}

impl Position {
    /// Create a new position
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another position
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Position) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Bearing to another position (clockwise from north)
    #[inline]
    #[must_use]
    pub fn bearing_to(&self, other: &Position) -> f64 {
        normalize_bearing((other.x - self.x).atan2(other.y - self.y))
    }

    /// Position reached by travelling `distance` along `bearing`
    #[inline]
    #[must_use]
    pub fn polar(&self, bearing: f64, distance: f64) -> Position {
        Position::new(
            self.x + distance * bearing.sin(),
            self.y + distance * bearing.cos(),
        )
    }

    /// Rotate this position clockwise about `about` by `angle` radians
    #[must_use]
    pub fn rotate_about(&self, about: &Position, angle: f64) -> Position {
        let dist = about.distance(self);
        if dist < TINY {
            return *self;
        }
        about.polar(about.bearing_to(self) + angle, dist)
    }

    /// Check whether two positions coincide within `tolerance`
    #[inline]
    #[must_use]
    pub fn is_coincident(&self, other: &Position, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }

    /// Midpoint of two positions
    #[inline]
    #[must_use]
    pub fn midpoint(&self, other: &Position) -> Position {
        Position::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Normalise an angle into `[0, 2π)`
#[must_use]
pub fn normalize_bearing(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can return TAU itself for tiny negative inputs
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Reverse of a bearing
#[inline]
#[must_use]
pub fn reverse_bearing(bearing: f64) -> f64 {
    normalize_bearing(bearing + PI)
}

/// Clockwise sweep from bearing `from` to bearing `to`, in `[0, 2π)`
#[inline]
#[must_use]
pub fn clockwise_sweep(from: f64, to: f64) -> f64 {
    normalize_bearing(to - from)
}

/// Signed area of a closed ring (positive when counter-clockwise)
#[must_use]
pub fn signed_area(ring: &[Position]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, p) in ring.iter().enumerate() {
        let q = &ring[(i + 1) % ring.len()];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

/// Area-weighted centroid of a closed ring, or the vertex mean for degenerate rings
#[must_use]
pub fn centroid(ring: &[Position]) -> Option<Position> {
    if ring.is_empty() {
        return None;
    }
    let area = signed_area(ring);
    if area.abs() < TINY {
        let n = ring.len() as f64;
        let (sx, sy) = ring.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Position::new(sx / n, sy / n));
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in ring.iter().enumerate() {
        let q = &ring[(i + 1) % ring.len()];
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    let k = 1.0 / (6.0 * area);
    Some(Position::new(cx * k, cy * k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn bearing_is_clockwise_from_north() {
        let o = Position::new(0.0, 0.0);
        assert!(o.bearing_to(&Position::new(0.0, 10.0)).abs() < 1e-12);
        assert!((o.bearing_to(&Position::new(10.0, 0.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!((o.bearing_to(&Position::new(0.0, -10.0)) - PI).abs() < 1e-12);
        assert!((o.bearing_to(&Position::new(-10.0, 0.0)) - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn polar_inverts_bearing() {
        let o = Position::new(100.0, 200.0);
        let p = o.polar(1.1, 25.0);
        assert!((o.distance(&p) - 25.0).abs() < 1e-9);
        assert!((o.bearing_to(&p) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn rotate_quarter_turn() {
        let o = Position::new(0.0, 0.0);
        let p = Position::new(0.0, 5.0).rotate_about(&o, FRAC_PI_2);
        assert!(p.is_coincident(&Position::new(5.0, 0.0), 1e-9));
    }

    #[test]
    fn square_area_and_centroid() {
        let ring = [
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(10.0, 10.0),
            Position::new(0.0, 10.0),
        ];
        assert!((signed_area(&ring) - 100.0).abs() < 1e-9);
        let c = centroid(&ring).unwrap();
        assert!(c.is_coincident(&Position::new(5.0, 5.0), 1e-9));
    }

    #[test]
    fn normalize_wraps_negative() {
        assert!((normalize_bearing(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!(normalize_bearing(TAU).abs() < 1e-12);
    }
}
