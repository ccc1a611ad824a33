//! Feature store
//!
//! Arena of every feature a session has created, keyed by [`FeatureId`].
//! The store is the sole owner of features; operations refer to them by id.
//!
//! # Core Concepts
//!
//! - **Back references**: `add_op`/`cut_op` maintain each feature's set of
//!   dependent operations. The two calls must stay symmetric; cutting a
//!   reference that was never added is a bug and panics.
//! - **Tombstones**: features are retired (made inactive), not removed, so
//!   undo, redo and predecessor lookup keep working.

use crate::error::EditError;
use crate::feature::{Feature, FeatureGeometry, FeatureState};
use crate::index::{NullIndex, SpatialIndex};
use crate::types::{EditSequence, EntityType, FeatureId, FeatureKind};
use cadastre_geom::{LineGeometry, Position};
use std::collections::BTreeMap;

/// Arena of features
#[derive(Debug)]
pub struct FeatureStore {
    features: BTreeMap<FeatureId, Feature>,
    next_id: u32,
    index: Box<dyn SpatialIndex>,
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureStore {
    /// Create an empty store with no spatial index
    #[must_use]
    pub fn new() -> Self {
        Self::with_index(Box::new(NullIndex))
    }

    /// Create an empty store that notifies `index`
    #[must_use]
    pub fn with_index(index: Box<dyn SpatialIndex>) -> Self {
        Self {
            features: BTreeMap::new(),
            next_id: 1,
            index,
        }
    }

    /// Look up a feature
    #[inline]
    #[must_use]
    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(&id)
    }

    /// Look up a feature that must exist
    ///
    /// # Errors
    /// Returns error if there is no such feature
    pub fn require(&self, id: FeatureId) -> Result<&Feature, EditError> {
        self.features.get(&id).ok_or(EditError::UnknownFeature(id))
    }

    /// Look up a feature that must exist and be active
    ///
    /// # Errors
    /// Returns error if there is no such feature or it is inactive
    pub fn require_active(&self, id: FeatureId) -> Result<&Feature, EditError> {
        let feature = self.require(id)?;
        if !feature.is_active() {
            return Err(EditError::InactiveFeature(id));
        }
        Ok(feature)
    }

    fn require_kind(&self, id: FeatureId, expected: FeatureKind) -> Result<&Feature, EditError> {
        let feature = self.require(id)?;
        if feature.kind() != expected {
            return Err(EditError::WrongFeatureKind {
                feature: id,
                expected,
                found: feature.kind(),
            });
        }
        Ok(feature)
    }

    /// Position of a point feature
    ///
    /// # Errors
    /// Returns error if the feature is missing, not a point, or has no geometry
    pub fn position(&self, id: FeatureId) -> Result<Position, EditError> {
        self.require_kind(id, FeatureKind::Point)?
            .position()
            .ok_or(EditError::MissingGeometry(id))
    }

    /// End points and shape of a line feature
    ///
    /// # Errors
    /// Returns error if the feature is missing, not a line, or has no geometry
    pub fn line(&self, id: FeatureId) -> Result<(FeatureId, FeatureId, LineGeometry), EditError> {
        self.require_kind(id, FeatureKind::Line)?
            .line()
            .map(|(s, e, shape)| (s, e, *shape))
            .ok_or(EditError::MissingGeometry(id))
    }

    /// Position and content of a text feature
    ///
    /// # Errors
    /// Returns error if the feature is missing, not text, or has no geometry
    pub fn text(&self, id: FeatureId) -> Result<(Position, String), EditError> {
        self.require_kind(id, FeatureKind::Text)?
            .text()
            .map(|(position, text)| (position, text.to_string()))
            .ok_or(EditError::MissingGeometry(id))
    }

    /// Every feature, in id order
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Active features, in id order
    pub fn active(&self) -> impl Iterator<Item = &Feature> {
        self.features.values().filter(|f| f.is_active())
    }

    /// Number of features, tombstones included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Is the store empty?
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Is `id` unused?
    #[inline]
    #[must_use]
    pub fn is_free(&self, id: FeatureId) -> bool {
        !self.features.contains_key(&id)
    }

    /// Create a geometry-less feature, using `id` when supplied
    ///
    /// # Errors
    /// Returns error if the requested id is already taken or no ids are left
    pub(crate) fn insert(
        &mut self,
        id: Option<FeatureId>,
        kind: FeatureKind,
        entity: EntityType,
        creator: EditSequence,
    ) -> Result<FeatureId, EditError> {
        let id = match id {
            Some(id) if !self.is_free(id) => return Err(EditError::DuplicateFeatureId(id)),
            Some(id) => id,
            None => {
                while !self.is_free(FeatureId(self.next_id)) {
                    self.next_id = self
                        .next_id
                        .checked_add(1)
                        .ok_or(EditError::IdsExhausted("feature id"))?;
                }
                FeatureId(self.next_id)
            }
        };
        let after = id
            .0
            .checked_add(1)
            .ok_or(EditError::IdsExhausted("feature id"))?;
        self.next_id = self.next_id.max(after);
        self.features.insert(id, Feature::new(id, kind, entity, creator));
        Ok(id)
    }

    fn slot(&mut self, id: FeatureId) -> &mut Feature {
        match self.features.get_mut(&id) {
            Some(feature) => feature,
            None => panic!("dangling feature reference {id}"),
        }
    }

    /// Register `op` as a dependent of `id`
    pub(crate) fn add_op(&mut self, id: FeatureId, op: EditSequence) {
        self.slot(id).dependents.insert(op);
    }

    /// Remove `op` from the dependents of `id`
    ///
    /// Panics if the reference was never added.
    pub(crate) fn cut_op(&mut self, id: FeatureId, op: EditSequence) {
        let removed = self.slot(id).dependents.remove(&op);
        assert!(removed, "edit {op} was not registered on feature {id}");
    }

    /// Set geometry, returning whether an existing geometry changed
    pub(crate) fn set_geometry(&mut self, id: FeatureId, geometry: FeatureGeometry) -> bool {
        let feature = self.slot(id);
        let first = feature.geometry.is_none();
        if feature.geometry.as_ref() == Some(&geometry) {
            return false;
        }
        let active = feature.is_active();
        feature.geometry = Some(geometry);
        if !first {
            feature.moved = true;
        }
        if let Some(g) = &self.features[&id].geometry {
            if active && first {
                self.index.added(id, g);
            } else if active {
                self.index.moved(id, g);
            }
        }
        !first
    }

    /// Check that a feature has no live dependents
    ///
    /// # Errors
    /// Returns error listing the dependents if there are any
    pub fn ensure_unreferenced(&self, id: FeatureId) -> Result<(), EditError> {
        let feature = self.require(id)?;
        if feature.dependents.is_empty() {
            Ok(())
        } else {
            Err(EditError::HasDependents {
                feature: id,
                dependents: feature.dependents.iter().copied().collect(),
            })
        }
    }

    /// Make a feature inactive (tombstone)
    pub(crate) fn retire(&mut self, id: FeatureId) {
        let feature = self.slot(id);
        if feature.state == FeatureState::Inactive {
            return;
        }
        feature.state = FeatureState::Inactive;
        if feature.geometry.is_some() {
            self.index.removed(id);
        }
    }

    /// Remove a feature that never received geometry
    ///
    /// The index never saw it, so it is not notified.
    pub(crate) fn drop_stub(&mut self, id: FeatureId) {
        let stub = self
            .features
            .get(&id)
            .is_some_and(|f| f.geometry.is_none() && f.dependents.is_empty());
        if stub {
            self.features.remove(&id);
        }
    }

    /// Make a tombstoned feature active again
    pub(crate) fn restore(&mut self, id: FeatureId) {
        let feature = self.slot(id);
        if feature.state == FeatureState::Active {
            return;
        }
        feature.state = FeatureState::Active;
        if let Some(g) = &self.features[&id].geometry {
            self.index.added(id, g);
        }
    }

    /// Set or clear the trimmed flag
    pub(crate) fn set_trimmed(&mut self, id: FeatureId, trimmed: bool) {
        self.slot(id).trimmed = trimmed;
    }

    /// Change the user-perceived key of a feature
    ///
    /// # Errors
    /// Returns error if the feature is missing or has live dependents
    pub(crate) fn rekey(&mut self, id: FeatureId, key: Option<String>) -> Result<(), EditError> {
        self.ensure_unreferenced(id)?;
        self.slot(id).key = key;
        Ok(())
    }

    /// Clear every moved flag, returning how many were set
    pub(crate) fn clear_moved(&mut self) -> usize {
        let mut count = 0;
        for feature in self.features.values_mut().filter(|f| f.moved) {
            feature.moved = false;
            count += 1;
        }
        count
    }

    /// Physically remove a tombstone
    ///
    /// # Errors
    /// Returns error if the feature is missing, still active, or referenced
    pub(crate) fn discard(&mut self, id: FeatureId) -> Result<Feature, EditError> {
        self.ensure_unreferenced(id)?;
        if self.require(id)?.is_active() {
            return Err(EditError::HasDependents {
                feature: id,
                dependents: vec![self.require(id)?.creator()],
            });
        }
        self.features.remove(&id).ok_or(EditError::UnknownFeature(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexEvent, RecordingIndex};

    fn point(store: &mut FeatureStore, creator: u32, x: f64, y: f64) -> FeatureId {
        let id = store
            .insert(None, FeatureKind::Point, EntityType::new("point"), EditSequence(creator))
            .unwrap();
        store.set_geometry(id, FeatureGeometry::Point { position: Position::new(x, y) });
        id
    }

    #[test]
    fn ids_are_allocated_in_order() {
        let mut store = FeatureStore::new();
        let a = point(&mut store, 1, 0.0, 0.0);
        let b = point(&mut store, 1, 1.0, 0.0);
        assert_eq!(a, FeatureId(1));
        assert_eq!(b, FeatureId(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn preassigned_ids_are_respected() {
        let mut store = FeatureStore::new();
        let id = store
            .insert(Some(FeatureId(10)), FeatureKind::Point, EntityType::new("p"), EditSequence(1))
            .unwrap();
        assert_eq!(id, FeatureId(10));
        assert!(matches!(
            store.insert(
                Some(FeatureId(10)),
                FeatureKind::Point,
                EntityType::new("p"),
                EditSequence(1),
            ),
            Err(EditError::DuplicateFeatureId(FeatureId(10)))
        ));
        let next = point(&mut store, 2, 0.0, 0.0);
        assert_eq!(next, FeatureId(11));
    }

    #[test]
    fn back_references_are_symmetric() {
        let mut store = FeatureStore::new();
        let a = point(&mut store, 1, 0.0, 0.0);
        store.add_op(a, EditSequence(2));
        assert!(store.ensure_unreferenced(a).is_err());
        store.cut_op(a, EditSequence(2));
        assert!(store.ensure_unreferenced(a).is_ok());
    }

    #[test]
    #[should_panic(expected = "was not registered")]
    fn cutting_an_unknown_reference_panics() {
        let mut store = FeatureStore::new();
        let a = point(&mut store, 1, 0.0, 0.0);
        store.cut_op(a, EditSequence(5));
    }

    #[test]
    fn moving_sets_flag_and_notifies() {
        let index = RecordingIndex::new();
        let mut store = FeatureStore::with_index(Box::new(index.clone()));
        let a = point(&mut store, 1, 0.0, 0.0);
        let moved =
            store.set_geometry(a, FeatureGeometry::Point { position: Position::new(1.0, 1.0) });
        assert!(moved);
        assert!(store.get(a).unwrap().is_moved());
        // same geometry again is not a move
        let same = FeatureGeometry::Point { position: Position::new(1.0, 1.0) };
        assert!(!store.set_geometry(a, same));
        store.retire(a);
        store.restore(a);
        assert_eq!(
            index.events(),
            vec![
                IndexEvent::Added(a),
                IndexEvent::Moved(a),
                IndexEvent::Removed(a),
                IndexEvent::Added(a)
            ]
        );
        assert_eq!(store.clear_moved(), 1);
        assert!(!store.get(a).unwrap().is_moved());
    }

    #[test]
    fn rekey_and_discard_respect_dependents() {
        let mut store = FeatureStore::new();
        let a = point(&mut store, 1, 0.0, 0.0);
        store.add_op(a, EditSequence(2));
        assert!(store.rekey(a, Some("A1".into())).unwrap_err().is_referential_integrity());
        store.cut_op(a, EditSequence(2));
        store.rekey(a, Some("A1".into())).unwrap();
        assert_eq!(store.get(a).unwrap().key.as_deref(), Some("A1"));

        assert!(store.discard(a).is_err());
        store.retire(a);
        store.discard(a).unwrap();
        assert!(store.get(a).is_none());
    }

    #[test]
    fn stubs_leave_without_notifying_the_index() {
        let index = RecordingIndex::new();
        let mut store = FeatureStore::with_index(Box::new(index.clone()));
        let stub = store
            .insert(None, FeatureKind::Line, EntityType::new("line"), EditSequence(1))
            .unwrap();
        store.retire(stub);
        store.drop_stub(stub);
        assert!(store.get(stub).is_none());
        assert!(index.events().is_empty());

        // features with geometry are not stubs
        let a = point(&mut store, 2, 0.0, 0.0);
        store.drop_stub(a);
        assert!(store.get(a).is_some());
    }

    #[test]
    fn exhausted_ids_are_an_error() {
        let mut store = FeatureStore::new();
        let last = Some(FeatureId(u32::MAX));
        assert!(matches!(
            store.insert(last, FeatureKind::Point, EntityType::new("p"), EditSequence(1)),
            Err(EditError::IdsExhausted(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn typed_lookups() {
        let mut store = FeatureStore::new();
        let a = point(&mut store, 1, 3.0, 4.0);
        assert_eq!(store.position(a).unwrap(), Position::new(3.0, 4.0));
        assert!(matches!(store.line(a), Err(EditError::WrongFeatureKind { .. })));
        assert!(matches!(store.position(FeatureId(99)), Err(EditError::UnknownFeature(_))));
        store.retire(a);
        assert!(matches!(store.require_active(a), Err(EditError::InactiveFeature(_))));
    }
}
