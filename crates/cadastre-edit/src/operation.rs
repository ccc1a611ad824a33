//! Operations
//!
//! An operation is one executed edit: its kind and observations, the features
//! it consumes and creates, the lines it split and the revisions applied to
//! it. Operations are owned by the session and addressed by sequence number.

use crate::edit::EditKind;
use crate::error::EditError;
use crate::revision::UpdateItems;
use crate::state_machine::{validate_transition, OperationState};
use crate::types::{EditSequence, FeatureId};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// A line replaced by sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRecord {
    /// The line that was split
    pub parent: FeatureId,
    /// The sections replacing it, start to end
    pub sections: Vec<FeatureId>,
}

/// One executed edit
#[derive(Debug, Clone)]
pub struct Operation {
    sequence: EditSequence,
    pub(crate) kind: EditKind,
    state: OperationState,
    pub(crate) outputs: IndexMap<String, FeatureId>,
    pub(crate) inputs: Vec<FeatureId>,
    pub(crate) splits: Vec<SplitRecord>,
    pub(crate) changed: bool,
    pub(crate) revisions: BTreeSet<EditSequence>,
    pub(crate) pending: Option<UpdateItems>,
}

impl Operation {
    /// Create an uncommitted operation
    #[must_use]
    pub fn new(sequence: EditSequence, kind: EditKind) -> Self {
        Self {
            sequence,
            kind,
            state: OperationState::Uncommitted,
            outputs: IndexMap::new(),
            inputs: Vec::new(),
            splits: Vec::new(),
            changed: false,
            revisions: BTreeSet::new(),
            pending: None,
        }
    }

    /// Edit-sequence number
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> EditSequence {
        self.sequence
    }

    /// Edit kind with its current observations
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &EditKind {
        &self.kind
    }

    /// Lifecycle state
    #[inline]
    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Output name to created feature
    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &IndexMap<String, FeatureId> {
        &self.outputs
    }

    /// Created feature for an output name
    #[must_use]
    pub fn output(&self, name: &str) -> Option<FeatureId> {
        self.outputs.get(name).copied()
    }

    /// Features consumed
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[FeatureId] {
        &self.inputs
    }

    /// Lines split
    #[inline]
    #[must_use]
    pub fn splits(&self) -> &[SplitRecord] {
        &self.splits
    }

    /// Live revisions of this edit
    #[inline]
    #[must_use]
    pub fn revisions(&self) -> &BTreeSet<EditSequence> {
        &self.revisions
    }

    /// Does rollforward need to recompute this edit?
    #[inline]
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Edit revised by this operation, if it is an update
    #[must_use]
    pub fn update_target(&self) -> Option<EditSequence> {
        match &self.kind {
            EditKind::Update { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Move to a new lifecycle state
    ///
    /// # Errors
    /// Returns error if the transition is not allowed
    pub(crate) fn transition(&mut self, to: OperationState) -> Result<(), EditError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }
}
