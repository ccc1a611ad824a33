//! Intersection family
//!
//! Low-level solvers return every candidate; the construction helpers at the
//! bottom of the module pick one answer and apply the projection scale
//! correction to ground distances.
//!
//! # Core Concepts
//!
//! - **Direction**: a bearing through an origin, optionally offset sideways
//! - **Default root**: the first of two circle roots in canonical order
//! - **Close-to point**: caller hint that disambiguates line crossings
//! - **Two-pass solve**: raw ground distances give an approximate answer, the
//!   distances are then rescaled by the line scale factor towards that answer
//!   and the construction is solved once more

use crate::circle::{intersect_circles, order_roots, select_root, Circle};
use crate::error::GeomError;
use crate::line::{LineGeometry, Segment};
use crate::position::{Position, TINY};
use crate::projection::SpatialSystem;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// A direction: an infinite line through `origin` at `bearing`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Point the direction is observed from
    pub origin: Position,
    /// Bearing clockwise from north
    pub bearing: f64,
}

impl Ray {
    /// Create a direction through `origin`
    #[inline]
    #[must_use]
    pub const fn new(origin: Position, bearing: f64) -> Self {
        Self { origin, bearing }
    }

    /// Direction parallel to `bearing`, shifted `offset` metres to the right
    #[must_use]
    pub fn with_offset(origin: Position, bearing: f64, offset: f64) -> Self {
        if offset.abs() < TINY {
            return Self::new(origin, bearing);
        }
        Self::new(origin.polar(bearing + FRAC_PI_2, offset), bearing)
    }

    /// Unit vector (east, north)
    #[inline]
    fn unit(&self) -> (f64, f64) {
        (self.bearing.sin(), self.bearing.cos())
    }

    /// Position at signed distance `t` from the origin
    #[inline]
    #[must_use]
    pub fn at(&self, t: f64) -> Position {
        self.origin.polar(self.bearing, t)
    }
}

/// Intersect two directions
///
/// # Errors
/// Returns error if the directions are parallel
pub fn intersect_rays(a: &Ray, b: &Ray) -> Result<Position, GeomError> {
    let (ax, ay) = a.unit();
    let (bx, by) = b.unit();
    let cross = ax * by - ay * bx;
    if cross.abs() < TINY {
        return Err(GeomError::ParallelDirections);
    }
    let dx = b.origin.x - a.origin.x;
    let dy = b.origin.y - a.origin.y;
    let t = (dx * by - dy * bx) / cross;
    Ok(a.at(t))
}

/// Intersect the infinite line of a direction with a circle
///
/// Returns zero, one or two positions; two are in canonical order.
#[must_use]
pub fn intersect_ray_circle(ray: &Ray, circle: &Circle) -> Vec<Position> {
    let (ux, uy) = ray.unit();
    let ox = ray.origin.x - circle.center.x;
    let oy = ray.origin.y - circle.center.y;
    let b = ux * ox + uy * oy;
    let c = ox * ox + oy * oy - circle.radius * circle.radius;
    let disc = b * b - c;
    if disc < -TINY {
        return Vec::new();
    }
    if disc <= TINY {
        return vec![ray.at(-b)];
    }
    let root = disc.sqrt();
    let mut roots = vec![ray.at(-b - root), ray.at(-b + root)];
    order_roots(&mut roots, &[circle.center]);
    roots
}

/// Crossing of two segments, if any
#[must_use]
pub fn intersect_segments(a: &Segment, b: &Segment, tolerance: f64) -> Option<Position> {
    let ray_a = Ray::new(a.start, a.bearing());
    let ray_b = Ray::new(b.start, b.bearing());
    if a.length() < TINY || b.length() < TINY {
        return None;
    }
    let x = intersect_rays(&ray_a, &ray_b).ok()?;
    (a.contains(&x, tolerance) && b.contains(&x, tolerance)).then_some(x)
}

/// Every crossing of a direction with a line
#[must_use]
pub fn intersect_ray_line(ray: &Ray, line: &LineGeometry, tolerance: f64) -> Vec<Position> {
    match line {
        LineGeometry::Segment(s) => {
            if s.length() < TINY {
                return Vec::new();
            }
            intersect_rays(ray, &Ray::new(s.start, s.bearing()))
                .ok()
                .filter(|x| s.contains(x, tolerance))
                .into_iter()
                .collect()
        }
        LineGeometry::Arc(a) => {
            let circle = Circle {
                center: a.center,
                radius: a.radius,
            };
            intersect_ray_circle(ray, &circle)
                .into_iter()
                .filter(|x| a.contains(x, tolerance))
                .collect()
        }
    }
}

/// Every crossing of two lines
#[must_use]
pub fn intersect_lines(a: &LineGeometry, b: &LineGeometry, tolerance: f64) -> Vec<Position> {
    let found = match (a, b) {
        (LineGeometry::Segment(sa), LineGeometry::Segment(sb)) => {
            intersect_segments(sa, sb, tolerance).into_iter().collect()
        }
        (LineGeometry::Segment(s), arc @ LineGeometry::Arc(_))
        | (arc @ LineGeometry::Arc(_), LineGeometry::Segment(s)) => {
            if s.length() < TINY {
                return Vec::new();
            }
            intersect_ray_line(&Ray::new(s.start, s.bearing()), arc, tolerance)
                .into_iter()
                .filter(|x| s.contains(x, tolerance))
                .collect()
        }
        (LineGeometry::Arc(aa), LineGeometry::Arc(ab)) => {
            let ca = Circle {
                center: aa.center,
                radius: aa.radius,
            };
            let cb = Circle {
                center: ab.center,
                radius: ab.radius,
            };
            intersect_circles(&ca, &cb)
                .unwrap_or_default()
                .into_iter()
                .filter(|x| aa.contains(x, tolerance) && ab.contains(x, tolerance))
                .collect()
        }
    };
    dedupe(found, tolerance)
}

fn dedupe(points: Vec<Position>, tolerance: f64) -> Vec<Position> {
    let mut out: Vec<Position> = Vec::with_capacity(points.len());
    for p in points {
        if !out.iter().any(|q| q.is_coincident(&p, tolerance)) {
            out.push(p);
        }
    }
    out
}

/// Candidate nearest to `target`
#[must_use]
pub fn closest_to(points: &[Position], target: &Position) -> Option<Position> {
    points
        .iter()
        .copied()
        .min_by(|a, b| a.distance(target).total_cmp(&b.distance(target)))
}

fn check_distance(distance: f64) -> Result<(), GeomError> {
    if distance.is_nan() || distance <= 0.0 {
        return Err(GeomError::NonPositiveDistance(distance));
    }
    Ok(())
}

/// Point at a ground distance along a bearing (sideshot)
///
/// # Errors
/// Returns error if the distance is not positive
pub fn radial(
    from: &Position,
    bearing: f64,
    ground: f64,
    system: &dyn SpatialSystem,
) -> Result<Position, GeomError> {
    check_distance(ground)?;
    let approx = from.polar(bearing, ground);
    Ok(from.polar(bearing, system.to_grid(ground, from, &approx)))
}

/// Intersect two ground distances observed from two centres
///
/// # Errors
/// Returns error if a distance is not positive, the centres coincide, or the
/// circles do not meet in either pass
pub fn distance_distance(
    c1: &Position,
    d1: f64,
    c2: &Position,
    d2: f64,
    use_default: bool,
    system: &dyn SpatialSystem,
) -> Result<Position, GeomError> {
    check_distance(d1)?;
    check_distance(d2)?;
    let solve = |r1: f64, r2: f64| -> Result<Position, GeomError> {
        let roots = intersect_circles(&Circle::new(*c1, r1)?, &Circle::new(*c2, r2)?)?;
        select_root(&roots, use_default).ok_or(GeomError::CirclesDoNotIntersect)
    };
    let approx = solve(d1, d2)?;
    solve(
        system.to_grid(d1, c1, &approx),
        system.to_grid(d2, c2, &approx),
    )
}

/// Intersect a direction with a ground distance from a centre
///
/// # Errors
/// Returns error if the distance is not positive or the direction misses the
/// circle in either pass
pub fn direction_distance(
    ray: &Ray,
    center: &Position,
    ground: f64,
    use_default: bool,
    system: &dyn SpatialSystem,
) -> Result<Position, GeomError> {
    check_distance(ground)?;
    let solve = |radius: f64| -> Result<Position, GeomError> {
        let roots = intersect_ray_circle(ray, &Circle::new(*center, radius)?);
        select_root(&roots, use_default).ok_or(GeomError::NoIntersection)
    };
    let approx = solve(ground)?;
    solve(system.to_grid(ground, center, &approx))
}

/// Intersect a direction with a line
///
/// With no `close_to` hint the crossing nearest the direction's origin wins.
///
/// # Errors
/// Returns error if the direction does not cross the line
pub fn direction_line(
    ray: &Ray,
    line: &LineGeometry,
    close_to: Option<&Position>,
    tolerance: f64,
) -> Result<Position, GeomError> {
    let found = intersect_ray_line(ray, line, tolerance);
    closest_to(&found, close_to.unwrap_or(&ray.origin)).ok_or(GeomError::NoIntersection)
}

/// Intersect two lines
///
/// With no `close_to` hint the crossing nearest either end of the first line
/// wins.
///
/// # Errors
/// Returns error if the lines do not cross
pub fn line_line(
    a: &LineGeometry,
    b: &LineGeometry,
    close_to: Option<&Position>,
    tolerance: f64,
) -> Result<Position, GeomError> {
    let found = intersect_lines(a, b, tolerance);
    let picked = match close_to {
        Some(hint) => closest_to(&found, hint),
        None => {
            let ends = [a.start(), a.end()];
            found.iter().copied().min_by(|p, q| {
                let dp = ends.iter().map(|e| e.distance(p)).fold(f64::INFINITY, f64::min);
                let dq = ends.iter().map(|e| e.distance(q)).fold(f64::INFINITY, f64::min);
                dp.total_cmp(&dq)
            })
        }
    };
    picked.ok_or(GeomError::NoIntersection)
}
