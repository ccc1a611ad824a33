//! Editor configuration
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! tolerance = 0.001
//! journal = true
//!
//! [projection]
//! model = "transverse_mercator"
//! central_easting = 500000.0
//! scale_factor = 0.9996
//! earth_radius = 6371000.0
//!
//! [entities]
//! point = "Survey Mark"
//! line = "Boundary"
//! ```

use crate::error::ConfigError;
use crate::types::{EntityType, FeatureKind};
use cadastre_geom::{Projection, XY_RESOLUTION};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default entity tags for created features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDefaults {
    /// Tag for points
    pub point: EntityType,
    /// Tag for lines
    pub line: EntityType,
    /// Tag for text
    pub text: EntityType,
    /// Tag for polygons
    pub polygon: EntityType,
}

impl EntityDefaults {
    /// Default tag for a feature kind
    #[must_use]
    pub fn for_kind(&self, kind: FeatureKind) -> &EntityType {
        match kind {
            FeatureKind::Point => &self.point,
            FeatureKind::Line => &self.line,
            FeatureKind::Text => &self.text,
            FeatureKind::Polygon => &self.polygon,
        }
    }
}

impl Default for EntityDefaults {
    fn default() -> Self {
        Self {
            point: EntityType::new("point"),
            line: EntityType::new("line"),
            text: EntityType::new("text"),
            polygon: EntityType::new("polygon"),
        }
    }
}

/// Editing session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Positional tolerance in metres
    pub tolerance: f64,
    /// Map projection used to scale observed distances
    pub projection: Projection,
    /// Keep the hash-chained edit journal
    pub journal: bool,
    /// Entity tags used when a request supplies none
    pub entities: EntityDefaults,
}

impl EditorConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set positional tolerance
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the projection model
    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Enable or disable the edit journal
    #[must_use]
    pub fn with_journal(mut self, enabled: bool) -> Self {
        self.journal = enabled;
        self
    }

    /// Set default entity tags
    #[must_use]
    pub fn with_entities(mut self, entities: EntityDefaults) -> Self {
        self.entities = entities;
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns error if the document does not parse or a value is out of range
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns error if the tolerance or a projection parameter is not positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "tolerance",
                reason: format!("must be positive, got {}", self.tolerance),
            });
        }
        let bad_projection = match self.projection {
            Projection::Plane => None,
            Projection::Constant { factor } => (factor <= 0.0).then_some("factor"),
            Projection::TransverseMercator {
                scale_factor,
                earth_radius,
                ..
            } => {
                if scale_factor <= 0.0 {
                    Some("scale_factor")
                } else if earth_radius <= 0.0 {
                    Some("earth_radius")
                } else {
                    None
                }
            }
        };
        if let Some(name) = bad_projection {
            return Err(ConfigError::Invalid {
                field: "projection",
                reason: format!("{name} must be positive"),
            });
        }
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            tolerance: XY_RESOLUTION,
            projection: Projection::Plane,
            journal: true,
            entities: EntityDefaults::default(),
        }
    }
}
