//! Error types for the editing engine
//!
//! Failures fall into three families:
//! - Invalid construction requests (degenerate geometry, bad inputs)
//! - Referential-integrity violations (features or edits with live dependents)
//! - Engine misuse (wrong lifecycle state, out-of-order sequences)
//!
//! A rollforward that halts is not an error; see
//! [`RollforwardReport`](crate::session::RollforwardReport).

use crate::state_machine::OperationState;
use crate::types::{EditSequence, FeatureId, FeatureKind};
use cadastre_geom::GeomError;
use std::path::PathBuf;

/// Main editing error type
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// The requested construction is geometrically impossible
    #[error("invalid construction: {0}")]
    Geometry(#[from] GeomError),

    /// A referenced feature does not exist
    #[error("unknown feature {0}")]
    UnknownFeature(FeatureId),

    /// A referenced feature has been deactivated
    #[error("feature {0} is inactive")]
    InactiveFeature(FeatureId),

    /// A referenced feature is of the wrong kind
    #[error("feature {feature} is a {found}, expected a {expected}")]
    WrongFeatureKind {
        /// The offending feature
        feature: FeatureId,
        /// Kind the edit needs
        expected: FeatureKind,
        /// Kind the feature has
        found: FeatureKind,
    },

    /// A referenced feature has no geometry yet
    #[error("feature {0} has no geometry")]
    MissingGeometry(FeatureId),

    /// A revision would make an edit depend on a later feature
    #[error("feature {feature} was created after edit {target}")]
    ForwardReference {
        /// The later feature
        feature: FeatureId,
        /// The edit being revised
        target: EditSequence,
    },

    /// A revision would change which features an edit creates or splits
    #[error("revision changes the features created by edit {0}")]
    StructureChanged(EditSequence),

    /// A feature still has live dependents
    #[error("feature {feature} is used by edits {dependents:?}")]
    HasDependents {
        /// The feature
        feature: FeatureId,
        /// Edits that depend on it
        dependents: Vec<EditSequence>,
    },

    /// An edit still has live revisions
    #[error("edit {sequence} has live revisions {revisions:?}")]
    HasRevisions {
        /// The revised edit
        sequence: EditSequence,
        /// Revisions still in effect
        revisions: Vec<EditSequence>,
    },

    /// Only the latest revision of an edit may be undone
    #[error("revision {sequence} is not the latest revision of edit {target}")]
    NotLatestRevision {
        /// The revision being undone
        sequence: EditSequence,
        /// The edit it revises
        target: EditSequence,
    },

    /// The edit kind cannot be revised
    #[error("{0} edits cannot be revised")]
    NotRevisable(&'static str),

    /// No edit has this sequence number
    #[error("unknown edit {0}")]
    UnknownEdit(EditSequence),

    /// The edit is not in a state that allows the action
    #[error("cannot {action} edit {sequence} while it is {state:?}")]
    InvalidState {
        /// The edit
        sequence: EditSequence,
        /// Its current state
        state: OperationState,
        /// What was attempted
        action: &'static str,
    },

    /// Lifecycle transition not in the transition table
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: OperationState,
        /// Requested state
        to: OperationState,
    },

    /// A pre-assigned feature id is already taken
    #[error("feature id {0} is already in use")]
    DuplicateFeatureId(FeatureId),

    /// A replayed sequence number is not above the last one
    #[error("edit sequence {got} is not above {expected}")]
    SequenceOutOfOrder {
        /// Lowest acceptable sequence
        expected: EditSequence,
        /// Sequence that was supplied
        got: EditSequence,
    },

    /// Every number above the highest one in use is taken
    #[error("no {0} numbers left")]
    IdsExhausted(&'static str),

    /// A persisted field list could not be read
    #[error("field error: {0}")]
    Field(#[from] FieldError),
}

impl EditError {
    /// Degenerate or invalid input; nothing was committed
    #[inline]
    #[must_use]
    pub fn is_invalid_construction(&self) -> bool {
        matches!(
            self,
            Self::Geometry(_)
                | Self::UnknownFeature(_)
                | Self::InactiveFeature(_)
                | Self::WrongFeatureKind { .. }
                | Self::MissingGeometry(_)
                | Self::ForwardReference { .. }
                | Self::StructureChanged(_)
                | Self::Field(_)
        )
    }

    /// Attempt to remove something that is still depended upon
    #[inline]
    #[must_use]
    pub fn is_referential_integrity(&self) -> bool {
        matches!(
            self,
            Self::HasDependents { .. } | Self::HasRevisions { .. } | Self::NotLatestRevision { .. }
        )
    }

    /// Can the caller repair the request and try again?
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_invalid_construction()
            || self.is_referential_integrity()
            || matches!(
                self,
                Self::InvalidState { .. } | Self::NotRevisable(_) | Self::UnknownEdit(_)
            )
    }
}

/// Persistence field-list errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    /// A required field is absent
    #[error("missing field `{0}`")]
    Missing(String),

    /// A field holds the wrong type of value
    #[error("field `{name}` should be {expected}")]
    TypeMismatch {
        /// Field name
        name: String,
        /// Expected value type
        expected: &'static str,
    },

    /// The edit kind does not have this field
    #[error("no field named `{0}`")]
    UnknownField(String),

    /// The record tag names no edit kind
    #[error("unknown edit tag `{0}`")]
    UnknownTag(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file is not valid TOML for the configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Edit journal errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JournalError {
    /// An entry's hash or back link does not match
    #[error("journal integrity violation at entry {index}")]
    IntegrityViolation {
        /// Position of the first bad entry
        index: usize,
    },
}

/// Edit-script errors
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The script is not valid JSON
    #[error("invalid script: {0}")]
    Json(#[from] serde_json::Error),

    /// A step failed
    #[error("step {index} failed: {source}")]
    Step {
        /// Zero-based step index
        index: usize,
        /// Engine error
        #[source]
        source: EditError,
    },
}

/// Operation-graph errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A dependency edge runs against the sequence order
    #[error("dependency {from} -> {to} runs backwards")]
    OutOfOrder {
        /// Edit depended upon
        from: EditSequence,
        /// Dependent edit
        to: EditSequence,
    },

    /// The graph has a cycle
    #[error("cycle detected in operation graph")]
    CycleDetected,
}
