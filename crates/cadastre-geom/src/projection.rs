//! Map-projection scale factors
//!
//! Observed distances are ground distances. Before they can be laid out on
//! the mapping plane they are multiplied by the projection's line scale
//! factor, which the constructions sample near the expected answer.

use crate::position::Position;
use serde::{Deserialize, Serialize};

/// Source of projection scale factors
pub trait SpatialSystem: std::fmt::Debug {
    /// Point scale factor at a position
    fn point_scale_factor(&self, at: &Position) -> f64;

    /// Line scale factor between two positions (Simpson's rule)
    fn line_scale_factor(&self, from: &Position, to: &Position) -> f64 {
        let k1 = self.point_scale_factor(from);
        let km = self.point_scale_factor(&from.midpoint(to));
        let k2 = self.point_scale_factor(to);
        (k1 + 4.0 * km + k2) / 6.0
    }

    /// Convert a ground distance along `from -> to` to a grid distance
    fn to_grid(&self, ground: f64, from: &Position, to: &Position) -> f64 {
        ground * self.line_scale_factor(from, to)
    }
}

/// Built-in projection models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Projection {
    /// Flat plane, scale factor of exactly one
    #[default]
    Plane,

    /// The same scale factor everywhere
    Constant {
        /// Scale factor applied to every distance
        factor: f64,
    },

    /// Spherical transverse Mercator approximation
    TransverseMercator {
        /// Easting of the central meridian
        central_easting: f64,
        /// Scale factor on the central meridian
        scale_factor: f64,
        /// Radius of the reference sphere in metres
        earth_radius: f64,
    },
}

impl Projection {
    /// UTM-like defaults for a zone centred on `central_easting`
    #[must_use]
    pub fn utm(central_easting: f64) -> Self {
        Self::TransverseMercator {
            central_easting,
            scale_factor: 0.9996,
            earth_radius: 6_371_000.0,
        }
    }
}

impl SpatialSystem for Projection {
    fn point_scale_factor(&self, at: &Position) -> f64 {
        match *self {
            Self::Plane => 1.0,
            Self::Constant { factor } => factor,
            Self::TransverseMercator {
                central_easting,
                scale_factor,
                earth_radius,
            } => {
                let de = at.x - central_easting;
                let rk = earth_radius * scale_factor;
                scale_factor * (1.0 + (de * de) / (2.0 * rk * rk))
            }
        }
    }

    fn line_scale_factor(&self, from: &Position, to: &Position) -> f64 {
        match *self {
            Self::Plane => 1.0,
            Self::Constant { factor } => factor,
            Self::TransverseMercator { .. } => {
                let k1 = self.point_scale_factor(from);
                let km = self.point_scale_factor(&from.midpoint(to));
                let k2 = self.point_scale_factor(to);
                (k1 + 4.0 * km + k2) / 6.0
            }
        }
    }
}
