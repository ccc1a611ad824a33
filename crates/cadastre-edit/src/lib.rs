//! Cadastral editing engine
//!
//! Features (points, lines, text, polygons) are created by operations. Each
//! operation records the features it consumed and created, so that a change
//! to an early observation can be rolled forward through every dependent
//! construction while feature identities stay the same.
//!
//! # Core Concepts
//!
//! - **Feature store**: arena of features keyed by [`FeatureId`]; features
//!   are tombstoned, never removed, while anything may still need them
//! - **Operations**: one per executed edit, numbered by a strictly
//!   increasing [`EditSequence`]
//! - **Back references**: every feature lists the live operations that
//!   consume it; undo and deletion are refused while that list is not empty
//! - **Rollforward**: recomputation in sequence order of every operation
//!   whose inputs moved, halting at the first one that can no longer be
//!   solved
//! - **Revisions**: a correction is itself an operation (`Update`) that
//!   exchanges field values with the edit it revises
//!
//! # Quick Start
//!
//! ```rust
//! use cadastre_edit::prelude::*;
//!
//! let mut session = Session::new(EditorConfig::default());
//! let a = session.execute(EditKind::NewPoint { position: Position::new(0.0, 0.0) })?;
//! let a = session.operation(a).and_then(|op| op.output("point")).unwrap();
//!
//! let radial = session.execute(EditKind::Radial {
//!     direction: Direction::new(a, 0.0),
//!     distance: 10.0,
//!     add_line: true,
//! })?;
//! let (_, report) =
//!     session.correct(radial, vec![Field::new("distance", FieldValue::Float(12.0))])?;
//! assert!(report.is_complete());
//! # Ok::<(), EditError>(())
//! ```

pub mod calc;
pub mod config;
pub mod edit;
pub mod error;
pub mod factory;
pub mod feature;
pub mod fields;
pub mod graph;
pub mod index;
pub mod journal;
pub mod operation;
pub mod revision;
pub mod script;
pub mod session;
pub mod state_machine;
pub mod store;
pub mod test_harness;
pub mod types;

pub use calc::{solve, CalcContext, EndRef, Planned, PlannedSplit, Solution};
pub use config::{EditorConfig, EntityDefaults};
pub use edit::{Capabilities, CircleObservation, Direction, EditKind, TextAnchor, CAPABILITIES};
pub use error::{ConfigError, EditError, FieldError, GraphError, JournalError, ScriptError};
pub use factory::{FeatureDescription, FeatureFactory};
pub use feature::{Feature, FeatureGeometry, FeatureState};
pub use fields::{EditRecord, Field, FieldCodec, FieldReader, FieldValue};
pub use graph::OperationGraph;
pub use index::{IndexEvent, NullIndex, RecordingIndex, SpatialIndex};
pub use journal::{EditJournal, JournalAction, JournalEntry};
pub use operation::{Operation, SplitRecord};
pub use revision::UpdateItems;
pub use script::{run_script, EditScript, ScriptReport, ScriptStep};
pub use session::{ProblemOperation, ReferenceProblem, RollforwardReport, Session, Snapshot};
pub use state_machine::{allowed_transitions, validate_transition, OperationState};
pub use store::FeatureStore;
pub use types::{EditSequence, EntityType, FeatureId, FeatureKind, SessionId};

/// Common imports
pub mod prelude {
    pub use crate::{
        CircleObservation, Direction, EditError, EditKind, EditSequence, EditorConfig, FeatureId,
        FeatureKind, Field, FieldValue, OperationState, RollforwardReport, Session, TextAnchor,
    };
    pub use cadastre_geom::{Leg, ObservedSpan, Position, Projection};
}
