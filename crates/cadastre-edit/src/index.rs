//! Spatial index notifications
//!
//! The engine does not own or query a spatial index. It only tells one when
//! features appear, move or leave the map.

use crate::feature::FeatureGeometry;
use crate::types::FeatureId;
use std::cell::RefCell;
use std::rc::Rc;

/// Receiver of feature lifecycle notifications
pub trait SpatialIndex: std::fmt::Debug {
    /// A feature joined the map (new, restored or redone)
    fn added(&mut self, id: FeatureId, geometry: &FeatureGeometry);

    /// A feature's geometry changed
    fn moved(&mut self, id: FeatureId, geometry: &FeatureGeometry);

    /// A feature left the map
    fn removed(&mut self, id: FeatureId);
}

/// Index that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndex;

impl SpatialIndex for NullIndex {
    fn added(&mut self, _id: FeatureId, _geometry: &FeatureGeometry) {}
    fn moved(&mut self, _id: FeatureId, _geometry: &FeatureGeometry) {}
    fn removed(&mut self, _id: FeatureId) {}
}

/// A notification seen by a [`RecordingIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEvent {
    /// Feature added
    Added(FeatureId),
    /// Feature moved
    Moved(FeatureId),
    /// Feature removed
    Removed(FeatureId),
}

/// Index that records notifications; clones share the same log
#[derive(Debug, Default, Clone)]
pub struct RecordingIndex {
    events: Rc<RefCell<Vec<IndexEvent>>>,
}

impl RecordingIndex {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications so far
    #[must_use]
    pub fn events(&self) -> Vec<IndexEvent> {
        self.events.borrow().clone()
    }

    /// Forget recorded notifications
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl SpatialIndex for RecordingIndex {
    fn added(&mut self, id: FeatureId, _geometry: &FeatureGeometry) {
        self.events.borrow_mut().push(IndexEvent::Added(id));
    }

    fn moved(&mut self, id: FeatureId, _geometry: &FeatureGeometry) {
        self.events.borrow_mut().push(IndexEvent::Moved(id));
    }

    fn removed(&mut self, id: FeatureId) {
        self.events.borrow_mut().push(IndexEvent::Removed(id));
    }
}
