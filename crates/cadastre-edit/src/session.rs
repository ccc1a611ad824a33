//! Editing session
//!
//! The session owns the feature store, every operation and the dependency
//! graph, and is the only entry point that mutates them. All state is
//! threaded through an explicit `Session` value; there is no global map.
//!
//! # Core Concepts
//!
//! - **Execute**: solve, create outputs, install back references, complete
//! - **Undo / Redo**: reverse or re-apply an operation keeping its sequence
//!   number and feature ids
//! - **Correct**: revise an earlier edit through a new `Update` operation,
//!   then roll forward
//! - **Rollforward**: recompute changed operations in sequence order, moving
//!   features in place, halting at the first one that can no longer be
//!   solved

use crate::calc::{solve, CalcContext, Solution};
use crate::config::EditorConfig;
use crate::edit::EditKind;
use crate::error::{EditError, GraphError};
use crate::factory::FeatureFactory;
use crate::feature::{Feature, FeatureGeometry};
use crate::fields::{EditRecord, Field};
use crate::graph::OperationGraph;
use crate::index::{NullIndex, SpatialIndex};
use crate::journal::{EditJournal, JournalAction};
use crate::operation::{Operation, SplitRecord};
use crate::revision::UpdateItems;
use crate::state_machine::OperationState;
use crate::store::FeatureStore;
use crate::types::{EditSequence, FeatureId, SessionId};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// The operation a rollforward could not recompute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProblemOperation {
    /// Edit that failed
    pub sequence: EditSequence,
    /// Display name of its kind
    pub name: String,
    /// Features it consumes
    pub inputs: Vec<FeatureId>,
    /// Why it failed
    pub reason: String,
}

/// Outcome of a rollforward
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollforwardReport {
    /// Edits recomputed, in order
    pub recomputed: Vec<EditSequence>,
    /// Features whose geometry changed
    pub moved: Vec<FeatureId>,
    /// Where propagation halted, if it did
    pub problem: Option<ProblemOperation>,
}

impl RollforwardReport {
    /// Did propagation reach the end?
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.problem.is_none()
    }
}

/// Graph state used to compare sessions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Active features
    pub active: BTreeSet<FeatureId>,
    /// Non-empty dependent sets
    pub dependents: BTreeMap<FeatureId, BTreeSet<EditSequence>>,
    /// Geometry of active features
    pub geometry: BTreeMap<FeatureId, FeatureGeometry>,
}

/// A broken cross reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceProblem {
    /// A live edit consumes a feature that does not list it
    MissingBackReference {
        /// The feature
        feature: FeatureId,
        /// The edit
        sequence: EditSequence,
    },
    /// A feature lists an edit that is not live or does not consume it
    StaleBackReference {
        /// The feature
        feature: FeatureId,
        /// The edit
        sequence: EditSequence,
    },
    /// An active feature whose creator is not live
    OrphanFeature {
        /// The feature
        feature: FeatureId,
    },
    /// A dependency edge runs backwards in sequence order
    BackwardEdge {
        /// Earlier end
        from: EditSequence,
        /// Later end
        to: EditSequence,
    },
}

/// One editing session
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: EditorConfig,
    store: FeatureStore,
    operations: BTreeMap<EditSequence, Operation>,
    graph: OperationGraph,
    journal: EditJournal,
    next_sequence: u32,
    problem: Option<ProblemOperation>,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self::with_index(config, Box::new(NullIndex))
    }

    /// Create an empty session that notifies a spatial index
    #[must_use]
    pub fn with_index(config: EditorConfig, index: Box<dyn SpatialIndex>) -> Self {
        let id = SessionId::new();
        Self {
            id,
            journal: EditJournal::new(id, config.journal),
            config,
            store: FeatureStore::with_index(index),
            operations: BTreeMap::new(),
            graph: OperationGraph::new(),
            next_sequence: 1,
            problem: None,
        }
    }

    /// Rebuild a session from persisted records
    ///
    /// Features are recreated with their recorded ids, so the rebuilt
    /// session produces the same records.
    ///
    /// # Errors
    /// Returns error if a record cannot be read or executed, or executes to
    /// different outputs
    pub fn replay(config: EditorConfig, records: &[EditRecord]) -> Result<Self, EditError> {
        let mut session = Self::new(config);
        for record in records {
            match record.kind()? {
                EditKind::Update { target, changes } => {
                    session.apply_correction(record.sequence, target, changes)?;
                }
                kind => {
                    let factory = FeatureFactory::from_outputs(&record.outputs, &record.entities);
                    session.apply_edit(record.sequence, kind, &factory)?;
                    if session.operation_ref(record.sequence)?.outputs != record.outputs {
                        return Err(EditError::StructureChanged(record.sequence));
                    }
                }
            }
        }
        Ok(session)
    }

    /// Session id
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Feature store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    /// Look up a feature
    #[inline]
    #[must_use]
    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.store.get(id)
    }

    /// Look up an operation
    #[inline]
    #[must_use]
    pub fn operation(&self, seq: EditSequence) -> Option<&Operation> {
        self.operations.get(&seq)
    }

    /// Every operation, undone ones included, in sequence order
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Edit journal
    #[inline]
    #[must_use]
    pub fn journal(&self) -> &EditJournal {
        &self.journal
    }

    /// Sequence number the next edit will get
    #[inline]
    #[must_use]
    pub fn next_sequence(&self) -> EditSequence {
        EditSequence(self.next_sequence)
    }

    /// Where the last rollforward halted, until a later one completes
    #[inline]
    #[must_use]
    pub fn pending_problem(&self) -> Option<&ProblemOperation> {
        self.problem.as_ref()
    }

    /// Execute an edit with default feature descriptions
    ///
    /// # Errors
    /// Returns error if the construction is invalid; nothing is committed
    pub fn execute(&mut self, kind: EditKind) -> Result<EditSequence, EditError> {
        self.execute_with(kind, &FeatureFactory::new())
    }

    /// Execute an edit, describing its outputs through `factory`
    ///
    /// An `Update` kind is routed to [`Session::correct`].
    ///
    /// # Errors
    /// Returns error if the construction is invalid; nothing is committed
    pub fn execute_with(
        &mut self,
        kind: EditKind,
        factory: &FeatureFactory,
    ) -> Result<EditSequence, EditError> {
        let seq = self.next_sequence();
        match kind {
            EditKind::Update { target, changes } => {
                self.apply_correction(seq, target, changes)?;
                Ok(seq)
            }
            kind => self.apply_edit(seq, kind, factory),
        }
    }

    /// Undo an edit
    ///
    /// Undoing an update reverts the correction and rolls forward.
    ///
    /// # Errors
    /// Returns error if the edit is not completed, has live revisions, or
    /// one of its outputs is still used by a live edit
    pub fn undo(&mut self, seq: EditSequence) -> Result<(), EditError> {
        let op = self.operation_ref(seq)?;
        if let Some(target) = op.update_target() {
            return self.undo_revision(seq, target);
        }
        match op.state() {
            OperationState::Completed => {}
            OperationState::SupersededByUpdate => {
                return Err(EditError::HasRevisions {
                    sequence: seq,
                    revisions: op.revisions.iter().copied().collect(),
                })
            }
            state => {
                return Err(EditError::InvalidState {
                    sequence: seq,
                    state,
                    action: "undo",
                })
            }
        }
        for id in op.outputs.values() {
            self.store.ensure_unreferenced(*id)?;
        }

        let mut op = self.take(seq)?;
        self.uninstall(&op);
        let done = op.transition(OperationState::Undone);
        tracing::info!("Undid {} (edit {})", op.kind.name(), seq);
        self.journal.append(JournalAction::Undone, seq, op.kind.name());
        self.operations.insert(seq, op);
        done
    }

    /// Re-complete an undone edit with its original sequence number and ids
    ///
    /// # Errors
    /// Returns error if the edit is not undone, an input is no longer
    /// active, or the construction no longer yields the same features
    pub fn redo(&mut self, seq: EditSequence) -> Result<(), EditError> {
        let op = self.operation_ref(seq)?;
        if op.state() != OperationState::Undone {
            return Err(EditError::InvalidState {
                sequence: seq,
                state: op.state(),
                action: "redo",
            });
        }
        if let Some(target) = op.update_target() {
            return self.redo_revision(seq, target);
        }

        let inputs = op.kind.required_features();
        self.check_inputs(&op.kind, &inputs)?;
        let solution = solve(
            &op.kind,
            &CalcContext::recompute(&self.store, &self.config, &op.outputs),
        )?;
        if !same_structure(&solution, op) {
            return Err(EditError::StructureChanged(seq));
        }

        let mut op = self.take(seq)?;
        let done = self.complete_redo(&mut op, &solution, inputs);
        tracing::info!("Redid {} (edit {})", op.kind.name(), seq);
        self.journal.append(JournalAction::Redone, seq, op.kind.name());
        self.operations.insert(seq, op);
        done
    }

    /// Correct an earlier edit and roll forward
    ///
    /// The correction becomes a new `Update` operation that depends on the
    /// edit it revises.
    ///
    /// # Errors
    /// Returns error if the edit cannot be revised or the revised
    /// construction is invalid; nothing is committed
    pub fn correct(
        &mut self,
        target: EditSequence,
        changes: Vec<Field>,
    ) -> Result<(EditSequence, RollforwardReport), EditError> {
        let seq = self.next_sequence();
        let report = self.apply_correction(seq, target, changes)?;
        Ok((seq, report))
    }

    /// Recompute changed edits from `from` onwards
    ///
    /// Each edit is either fully recomputed or propagation halts there and
    /// the edit is reported as the problem operation.
    pub fn rollforward(&mut self, from: EditSequence) -> RollforwardReport {
        let mut report = RollforwardReport::default();
        let live: Vec<EditSequence> = self
            .operations
            .range(from..)
            .filter(|(_, op)| op.state().is_live())
            .map(|(seq, _)| *seq)
            .collect();

        for seq in live {
            let Some(op) = self.operations.get(&seq) else {
                continue;
            };
            if !op.changed {
                continue;
            }
            if op.update_target().is_some() {
                self.mark_unchanged(seq);
                continue;
            }

            let outcome = solve(
                &op.kind,
                &CalcContext::recompute(&self.store, &self.config, &op.outputs),
            )
            .and_then(|solution| {
                if same_structure(&solution, op) {
                    Ok(solution)
                } else {
                    Err(EditError::StructureChanged(seq))
                }
            });
            let solution = match outcome {
                Ok(solution) => solution,
                Err(err) => {
                    let problem = ProblemOperation {
                        sequence: seq,
                        name: op.kind.name().to_string(),
                        inputs: op.inputs.clone(),
                        reason: err.to_string(),
                    };
                    tracing::warn!("Rollforward halted at edit {}: {}", seq, problem.reason);
                    self.journal
                        .append(JournalAction::RollforwardHalted, seq, problem.reason.clone());
                    self.problem = Some(problem.clone());
                    report.problem = Some(problem);
                    return report;
                }
            };

            let updates: Vec<(FeatureId, FeatureGeometry)> = solution
                .outputs
                .iter()
                .filter_map(|(name, planned)| {
                    op.output(name).map(|id| (id, planned.resolve(&op.outputs)))
                })
                .collect();
            for (id, geometry) in updates {
                if self.store.set_geometry(id, geometry) {
                    tracing::debug!("Moved feature {} (edit {})", id, seq);
                    report.moved.push(id);
                    self.mark_dependents(id);
                }
            }
            self.mark_unchanged(seq);
            tracing::debug!("Recomputed edit {}", seq);
            report.recomputed.push(seq);
        }

        if self.problem_resolved(from) {
            self.problem = None;
        }
        if !report.recomputed.is_empty() {
            self.journal.append(
                JournalAction::RolledForward,
                from,
                format!("{} edits recomputed", report.recomputed.len()),
            );
        }
        report
    }

    /// The line a split section was cut from
    #[must_use]
    pub fn get_predecessor(&self, line: FeatureId) -> Option<FeatureId> {
        let creator = self.store.get(line)?.creator();
        self.operations
            .get(&creator)?
            .splits
            .iter()
            .find(|split| split.sections.contains(&line))
            .map(|split| split.parent)
    }

    /// Edits `seq` depends on, directly or indirectly
    #[must_use]
    pub fn required_edits(&self, seq: EditSequence) -> BTreeSet<EditSequence> {
        self.graph.required_edits(seq)
    }

    /// Edits that depend on `seq`, directly or indirectly
    #[must_use]
    pub fn dependent_edits(&self, seq: EditSequence) -> BTreeSet<EditSequence> {
        self.graph.dependent_edits(seq)
    }

    /// Check that every dependency runs forward in sequence order
    ///
    /// # Errors
    /// Returns the first backwards edge
    pub fn validate_order(&self) -> Result<(), GraphError> {
        self.graph.validate_order()
    }

    /// Active features and back references
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            active: BTreeSet::new(),
            dependents: BTreeMap::new(),
            geometry: BTreeMap::new(),
        };
        for feature in self.store.iter() {
            if feature.is_active() {
                snapshot.active.insert(feature.id());
                if let Some(g) = feature.geometry() {
                    snapshot.geometry.insert(feature.id(), g.clone());
                }
            }
            if !feature.dependents().is_empty() {
                snapshot
                    .dependents
                    .insert(feature.id(), feature.dependents().clone());
            }
        }
        snapshot
    }

    /// Every broken cross reference; empty when the graph is consistent
    #[must_use]
    pub fn check_references(&self) -> Vec<ReferenceProblem> {
        let mut problems = Vec::new();
        for op in self.operations.values().filter(|op| op.state().is_live()) {
            for id in &op.inputs {
                let listed = self
                    .store
                    .get(*id)
                    .is_some_and(|f| f.dependents().contains(&op.sequence()));
                if !listed {
                    problems.push(ReferenceProblem::MissingBackReference {
                        feature: *id,
                        sequence: op.sequence(),
                    });
                }
            }
        }
        for feature in self.store.iter() {
            for seq in feature.dependents() {
                let consumes = self
                    .operations
                    .get(seq)
                    .is_some_and(|op| op.state().is_live() && op.inputs.contains(&feature.id()));
                if !consumes {
                    problems.push(ReferenceProblem::StaleBackReference {
                        feature: feature.id(),
                        sequence: *seq,
                    });
                }
            }
            let owned = self
                .operations
                .get(&feature.creator())
                .is_some_and(|op| op.state().is_live());
            if feature.is_active() && !owned {
                problems.push(ReferenceProblem::OrphanFeature {
                    feature: feature.id(),
                });
            }
        }
        if let Err(GraphError::OutOfOrder { from, to }) = self.graph.validate_order() {
            problems.push(ReferenceProblem::BackwardEdge { from, to });
        }
        problems
    }

    /// Change the user-perceived key of a feature
    ///
    /// # Errors
    /// Returns error if the feature is missing or still used by a live edit
    pub fn rekey(&mut self, id: FeatureId, key: Option<String>) -> Result<(), EditError> {
        self.store.rekey(id, key)
    }

    /// Clear every moved flag, returning how many were set
    pub fn clear_moved(&mut self) -> usize {
        self.store.clear_moved()
    }

    /// Persisted form of every live edit, in sequence order
    ///
    /// Revised edits are written with their original values; the updates
    /// that follow them carry the corrections.
    #[must_use]
    pub fn records(&self) -> Vec<EditRecord> {
        self.operations
            .values()
            .filter(|op| op.state().is_live())
            .map(|op| {
                let mut kind = op.kind.clone();
                for rev in op.revisions.iter().rev() {
                    let pending = self.operations.get(rev).and_then(|u| u.pending.clone());
                    if let Some(mut items) = pending {
                        if let Ok(original) = items.exchange(&kind) {
                            kind = original;
                        }
                    }
                }
                let entities = op
                    .outputs
                    .iter()
                    .filter_map(|(name, id)| {
                        let feature = self.store.get(*id)?;
                        let default = self.config.entities.for_kind(feature.kind());
                        (feature.entity != *default).then(|| (name.clone(), feature.entity.clone()))
                    })
                    .collect();
                EditRecord {
                    sequence: op.sequence(),
                    tag: kind.tag().to_string(),
                    fields: kind.fields(),
                    outputs: op.outputs.clone(),
                    entities,
                }
            })
            .collect()
    }

    /// Drop undone edits and their tombstones; they can no longer be redone
    ///
    /// # Errors
    /// Returns error if a tombstone is unexpectedly still referenced
    pub fn purge_undone(&mut self) -> Result<usize, EditError> {
        let undone: Vec<EditSequence> = self
            .operations
            .values()
            .filter(|op| op.state() == OperationState::Undone)
            .map(Operation::sequence)
            .collect();
        for seq in &undone {
            if let Some(op) = self.operations.remove(seq) {
                for id in op.outputs.values() {
                    self.store.discard(*id)?;
                }
            }
        }
        Ok(undone.len())
    }

    fn operation_ref(&self, seq: EditSequence) -> Result<&Operation, EditError> {
        self.operations.get(&seq).ok_or(EditError::UnknownEdit(seq))
    }

    fn operation_mut(&mut self, seq: EditSequence) -> Result<&mut Operation, EditError> {
        self.operations.get_mut(&seq).ok_or(EditError::UnknownEdit(seq))
    }

    fn take(&mut self, seq: EditSequence) -> Result<Operation, EditError> {
        self.operations.remove(&seq).ok_or(EditError::UnknownEdit(seq))
    }

    fn check_sequence(&self, seq: EditSequence) -> Result<(), EditError> {
        if seq.0 == u32::MAX {
            return Err(EditError::IdsExhausted("edit sequence"));
        }
        if seq.0 < self.next_sequence {
            return Err(EditError::SequenceOutOfOrder {
                expected: self.next_sequence(),
                got: seq,
            });
        }
        Ok(())
    }

    fn claim(&mut self, seq: EditSequence) {
        assert!(
            seq.0 >= self.next_sequence,
            "edit sequence {seq} allocated out of order"
        );
        self.next_sequence = seq.0.saturating_add(1);
    }

    fn check_inputs(&self, kind: &EditKind, inputs: &[FeatureId]) -> Result<(), EditError> {
        for id in inputs {
            self.store.require_active(*id)?;
        }
        if let EditKind::Deletion { features } = kind {
            for id in features {
                self.store.ensure_unreferenced(*id)?;
            }
        }
        Ok(())
    }

    fn apply_edit(
        &mut self,
        seq: EditSequence,
        kind: EditKind,
        factory: &FeatureFactory,
    ) -> Result<EditSequence, EditError> {
        self.check_sequence(seq)?;
        let inputs = kind.required_features();
        self.check_inputs(&kind, &inputs)?;
        let solution = solve(&kind, &CalcContext::new(&self.store, &self.config))?;
        factory.check(solution.outputs.keys().map(String::as_str), &self.store)?;

        let mut op = Operation::new(seq, kind);
        op.transition(OperationState::Executing)?;
        let outputs = self.create_outputs(seq, &solution, factory)?;
        for (name, planned) in &solution.outputs {
            self.store.set_geometry(outputs[name], planned.resolve(&outputs));
        }
        op.transition(OperationState::GeometryCalculated)?;
        op.splits = resolve_splits(&solution, &outputs);
        op.outputs = outputs;
        op.inputs = inputs;
        self.install(&op);
        op.transition(OperationState::Completed)?;
        self.claim(seq);

        tracing::info!("Executed {} as edit {}", op.kind.name(), seq);
        self.journal.append(JournalAction::Executed, seq, op.kind.name());
        self.operations.insert(seq, op);
        Ok(seq)
    }

    fn create_outputs(
        &mut self,
        seq: EditSequence,
        solution: &Solution,
        factory: &FeatureFactory,
    ) -> Result<IndexMap<String, FeatureId>, EditError> {
        let mut outputs = IndexMap::with_capacity(solution.outputs.len());
        for (name, planned) in &solution.outputs {
            let created = factory.create(
                name,
                planned.kind(),
                seq,
                &self.config.entities,
                &mut self.store,
            );
            match created {
                Ok(id) => {
                    outputs.insert(name.clone(), id);
                }
                Err(err) => {
                    for id in outputs.values() {
                        self.store.drop_stub(*id);
                    }
                    return Err(err);
                }
            }
        }
        Ok(outputs)
    }

    fn complete_redo(
        &mut self,
        op: &mut Operation,
        solution: &Solution,
        inputs: Vec<FeatureId>,
    ) -> Result<(), EditError> {
        op.transition(OperationState::Executing)?;
        for (name, planned) in &solution.outputs {
            if let Some(id) = op.output(name) {
                self.store.set_geometry(id, planned.resolve(&op.outputs));
                self.store.restore(id);
            }
        }
        op.transition(OperationState::GeometryCalculated)?;
        op.inputs = inputs;
        op.changed = false;
        self.install(op);
        op.transition(OperationState::Completed)
    }

    /// Register back references, retire what the edit replaces, add graph edges
    fn install(&mut self, op: &Operation) {
        let seq = op.sequence();
        for id in &op.inputs {
            self.store.add_op(*id, seq);
        }
        for split in &op.splits {
            self.store.retire(split.parent);
        }
        match &op.kind {
            EditKind::Deletion { features } => {
                for id in features {
                    self.store.retire(*id);
                }
            }
            EditKind::MoveText { text, .. } => self.store.retire(*text),
            EditKind::TrimLines { lines } => {
                for id in lines {
                    self.store.set_trimmed(*id, true);
                }
            }
            _ => {}
        }
        let creators: Vec<EditSequence> = op
            .inputs
            .iter()
            .filter_map(|id| self.store.get(*id))
            .map(Feature::creator)
            .collect();
        self.graph.add_operation(seq, creators);
    }

    /// Exact inverse of [`Session::install`], plus tombstoning the outputs
    fn uninstall(&mut self, op: &Operation) {
        let seq = op.sequence();
        for id in &op.inputs {
            self.store.cut_op(*id, seq);
        }
        for id in op.outputs.values() {
            self.store.retire(*id);
        }
        for split in &op.splits {
            self.store.restore(split.parent);
        }
        match &op.kind {
            EditKind::Deletion { features } => {
                for id in features {
                    self.store.restore(*id);
                }
            }
            EditKind::MoveText { text, .. } => self.store.restore(*text),
            EditKind::TrimLines { lines } => {
                for id in lines {
                    let still = self.trimmed_elsewhere(*id, seq);
                    self.store.set_trimmed(*id, still);
                }
            }
            _ => {}
        }
        self.graph.remove_operation(seq);
    }

    fn trimmed_elsewhere(&self, line: FeatureId, except: EditSequence) -> bool {
        self.operations.values().any(|op| {
            op.sequence() != except
                && op.state().is_live()
                && matches!(&op.kind, EditKind::TrimLines { lines } if lines.contains(&line))
        })
    }

    /// A halted edit stays pending until a rollforward covering it
    /// completes, or it is no longer live and flagged
    fn problem_resolved(&self, from: EditSequence) -> bool {
        self.problem.as_ref().is_some_and(|problem| {
            problem.sequence >= from
                || !self
                    .operations
                    .get(&problem.sequence)
                    .is_some_and(|op| op.state().is_live() && op.changed)
        })
    }

    fn mark_unchanged(&mut self, seq: EditSequence) {
        if let Some(op) = self.operations.get_mut(&seq) {
            op.changed = false;
        }
    }

    fn mark_dependents(&mut self, id: FeatureId) {
        let dependents: Vec<EditSequence> = self
            .store
            .get(id)
            .map(|f| f.dependents().iter().copied().collect())
            .unwrap_or_default();
        for seq in dependents {
            if let Some(op) = self.operations.get_mut(&seq) {
                op.changed = true;
            }
        }
    }

    /// Replace the observations of `target`, rewiring its back references
    ///
    /// Checks everything before changing anything.
    fn revise(&mut self, target: EditSequence, kind: EditKind) -> Result<(), EditError> {
        let op = self.operation_ref(target)?;
        let inputs = kind.required_features();
        for id in &inputs {
            let feature = self.store.require(*id)?;
            if op.inputs.contains(id) {
                continue;
            }
            if feature.creator() >= target {
                return Err(EditError::ForwardReference { feature: *id, target });
            }
            if !feature.is_active() {
                return Err(EditError::InactiveFeature(*id));
            }
        }
        let solution = solve(
            &kind,
            &CalcContext::recompute(&self.store, &self.config, &op.outputs),
        )?;
        if !same_structure(&solution, op) {
            return Err(EditError::StructureChanged(target));
        }

        let old_inputs = op.inputs.clone();
        for id in &old_inputs {
            self.store.cut_op(*id, target);
        }
        for id in &inputs {
            self.store.add_op(*id, target);
        }
        let creators: Vec<EditSequence> = inputs
            .iter()
            .filter_map(|id| self.store.get(*id))
            .map(Feature::creator)
            .collect();
        self.graph.set_dependencies(target, creators);

        let op = self.operation_mut(target)?;
        op.kind = kind;
        op.inputs = inputs;
        Ok(())
    }

    fn apply_correction(
        &mut self,
        seq: EditSequence,
        target: EditSequence,
        changes: Vec<Field>,
    ) -> Result<RollforwardReport, EditError> {
        self.check_sequence(seq)?;
        let op = self.operation_ref(target)?;
        if !op.kind.capabilities().revisable {
            return Err(EditError::NotRevisable(op.kind.name()));
        }
        if !op.state().is_live() {
            return Err(EditError::InvalidState {
                sequence: target,
                state: op.state(),
                action: "correct",
            });
        }
        let mut items = UpdateItems::new(&changes);
        let kind = items.exchange(&op.kind)?;
        self.revise(target, kind)?;

        let mut update = Operation::new(seq, EditKind::Update { target, changes });
        update.transition(OperationState::Executing)?;
        update.transition(OperationState::GeometryCalculated)?;
        update.transition(OperationState::Completed)?;
        update.pending = Some(items);
        self.claim(seq);
        self.graph.add_operation(seq, [target]);
        self.supersede(target, seq)?;
        self.operations.insert(seq, update);

        tracing::info!("Corrected edit {} with update {}", target, seq);
        self.journal
            .append(JournalAction::Corrected, seq, format!("revises edit {target}"));
        Ok(self.rollforward(target))
    }

    fn supersede(&mut self, target: EditSequence, update: EditSequence) -> Result<(), EditError> {
        let op = self.operation_mut(target)?;
        if op.state() == OperationState::Completed {
            op.transition(OperationState::SupersededByUpdate)?;
        }
        op.revisions.insert(update);
        op.changed = true;
        Ok(())
    }

    fn undo_revision(&mut self, seq: EditSequence, target: EditSequence) -> Result<(), EditError> {
        let update = self.operation_ref(seq)?;
        if update.state() != OperationState::Completed {
            return Err(EditError::InvalidState {
                sequence: seq,
                state: update.state(),
                action: "undo",
            });
        }
        let mut items = update.pending.clone().unwrap_or_default();
        let target_op = self.operation_ref(target)?;
        if target_op.revisions.last() != Some(&seq) {
            return Err(EditError::NotLatestRevision { sequence: seq, target });
        }
        let kind = items.exchange(&target_op.kind)?;
        self.revise(target, kind)?;

        let update = self.operation_mut(seq)?;
        update.pending = Some(items);
        update.transition(OperationState::Undone)?;
        self.graph.remove_operation(seq);

        let op = self.operation_mut(target)?;
        op.revisions.remove(&seq);
        if op.revisions.is_empty() && op.state() == OperationState::SupersededByUpdate {
            op.transition(OperationState::Completed)?;
        }
        op.changed = true;

        tracing::info!("Undid update {} of edit {}", seq, target);
        self.journal
            .append(JournalAction::Undone, seq, format!("revision of edit {target}"));
        self.rollforward(target);
        Ok(())
    }

    fn redo_revision(&mut self, seq: EditSequence, target: EditSequence) -> Result<(), EditError> {
        let target_op = self.operation_ref(target)?;
        if !target_op.state().is_live() {
            return Err(EditError::InvalidState {
                sequence: target,
                state: target_op.state(),
                action: "correct",
            });
        }
        if target_op.revisions.last().is_some_and(|last| *last > seq) {
            return Err(EditError::InvalidState {
                sequence: seq,
                state: OperationState::Undone,
                action: "redo",
            });
        }
        let mut items = self
            .operation_ref(seq)?
            .pending
            .clone()
            .unwrap_or_default();
        let kind = items.exchange(&target_op.kind)?;
        self.revise(target, kind)?;

        let update = self.operation_mut(seq)?;
        update.pending = Some(items);
        update.transition(OperationState::Executing)?;
        update.transition(OperationState::GeometryCalculated)?;
        update.transition(OperationState::Completed)?;
        self.graph.add_operation(seq, [target]);
        self.supersede(target, seq)?;

        tracing::info!("Redid update {} of edit {}", seq, target);
        self.journal
            .append(JournalAction::Redone, seq, format!("revision of edit {target}"));
        self.rollforward(target);
        Ok(())
    }
}

fn resolve_splits(solution: &Solution, outputs: &IndexMap<String, FeatureId>) -> Vec<SplitRecord> {
    solution
        .splits
        .iter()
        .map(|split| SplitRecord {
            parent: split.parent,
            sections: split
                .sections
                .iter()
                .filter_map(|name| outputs.get(name).copied())
                .collect(),
        })
        .collect()
}

/// Does a fresh solution create and split exactly what `op` already did?
fn same_structure(solution: &Solution, op: &Operation) -> bool {
    solution.matches(&op.outputs)
        && solution.splits.len() == op.splits.len()
        && solution
            .splits
            .iter()
            .zip(&op.splits)
            .all(|(planned, done)| planned.parent == done.parent)
}
