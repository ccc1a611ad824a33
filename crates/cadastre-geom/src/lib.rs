//! Survey geometry kernel
//!
//! Stateless functions used by the cadastral editing engine. Nothing in this
//! crate knows about features, operations or sessions: every function takes
//! positions and observations and returns positions, line shapes or a
//! [`GeomError`].
//!
//! # Core Concepts
//!
//! - **Bearings**: radians clockwise from grid north, in `[0, 2π)`
//! - **Ground vs grid**: observed distances are ground distances; the
//!   [`SpatialSystem`] converts them to grid distances
//! - **Canonical roots**: two-root answers are ordered so the first one is
//!   the default
//!
//! # Example
//!
//! ```rust
//! use cadastre_geom::{distance_distance, Position, Projection};
//!
//! let x = distance_distance(
//!     &Position::new(0.0, 0.0), 5.0,
//!     &Position::new(8.0, 0.0), 5.0,
//!     true,
//!     &Projection::Plane,
//! ).unwrap();
//! assert!(x.is_coincident(&Position::new(4.0, 3.0), 1e-9));
//! ```

pub mod circle;
pub mod error;
pub mod intersect;
pub mod line;
pub mod position;
pub mod projection;
pub mod redistribute;
pub mod traverse;

pub use circle::{intersect_circles, order_roots, select_root, Circle};
pub use error::GeomError;
pub use intersect::{
    closest_to, direction_distance, direction_line, distance_distance, intersect_lines,
    intersect_ray_circle, intersect_ray_line, intersect_rays, line_line, radial, Ray,
};
pub use line::{Arc, LineGeometry, Segment};
pub use position::{
    centroid, clockwise_sweep, normalize_bearing, reverse_bearing, signed_area, Position, TINY,
    XY_RESOLUTION,
};
pub use projection::{Projection, SpatialSystem};
pub use redistribute::{cumulative, redistribute, ObservedSpan};
pub use traverse::{adjust, project, Adjustment, Leg, LegShape, PathLayout, PathSpan};
