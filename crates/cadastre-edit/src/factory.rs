//! Feature factory
//!
//! Turns declarative feature descriptions into live, geometry-less features.
//! Descriptions are keyed by the output name an edit gives each feature it
//! creates (`point`, `line.before`, `point.3`, ...). A description for a bare
//! prefix (`point`) covers every numbered output with that prefix.

use crate::config::EntityDefaults;
use crate::error::EditError;
use crate::store::FeatureStore;
use crate::types::{EditSequence, EntityType, FeatureId, FeatureKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How to create one output feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDescription {
    /// Entity tag; the configured default for the kind when absent
    pub entity: Option<EntityType>,
    /// Pre-assigned id (used when reloading persisted edits)
    pub id: Option<FeatureId>,
}

/// Collection of feature descriptions for one edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFactory {
    descriptions: IndexMap<String, FeatureDescription>,
}

impl FeatureFactory {
    /// Factory with no descriptions (every output gets defaults)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Describe the output called `field`
    #[must_use]
    pub fn with_description(
        mut self,
        field: impl Into<String>,
        description: FeatureDescription,
    ) -> Self {
        self.descriptions.insert(field.into(), description);
        self
    }

    /// Give the output called `field` an entity tag
    #[must_use]
    pub fn with_entity(self, field: impl Into<String>, entity: EntityType) -> Self {
        self.with_description(
            field,
            FeatureDescription {
                entity: Some(entity),
                id: None,
            },
        )
    }

    /// Factory that recreates persisted outputs with their original ids
    #[must_use]
    pub fn from_outputs(
        outputs: &IndexMap<String, FeatureId>,
        entities: &IndexMap<String, EntityType>,
    ) -> Self {
        let descriptions = outputs
            .iter()
            .map(|(name, id)| {
                (
                    name.clone(),
                    FeatureDescription {
                        entity: entities.get(name).cloned(),
                        id: Some(*id),
                    },
                )
            })
            .collect();
        Self { descriptions }
    }

    fn lookup(&self, field: &str) -> Option<&FeatureDescription> {
        self.descriptions.get(field).or_else(|| {
            let prefix = field.split_once('.').map(|(p, _)| p)?;
            self.descriptions.get(prefix).filter(|d| d.id.is_none())
        })
    }

    /// Is there a description for `field`?
    #[must_use]
    pub fn has_description(&self, field: &str) -> bool {
        self.lookup(field).is_some()
    }

    /// Check that every pre-assigned id for `fields` is free
    ///
    /// # Errors
    /// Returns error naming the first id already in use
    pub fn check<'a>(
        &self,
        fields: impl IntoIterator<Item = &'a str>,
        store: &FeatureStore,
    ) -> Result<(), EditError> {
        for field in fields {
            if let Some(id) = self.lookup(field).and_then(|d| d.id) {
                if !store.is_free(id) {
                    return Err(EditError::DuplicateFeatureId(id));
                }
            }
        }
        Ok(())
    }

    /// Create the feature for output `field`
    ///
    /// # Errors
    /// Returns error if a pre-assigned id is already in use
    pub(crate) fn create(
        &self,
        field: &str,
        kind: FeatureKind,
        creator: EditSequence,
        defaults: &EntityDefaults,
        store: &mut FeatureStore,
    ) -> Result<FeatureId, EditError> {
        let description = self.lookup(field);
        let entity = description
            .and_then(|d| d.entity.clone())
            .unwrap_or_else(|| defaults.for_kind(kind).clone());
        store.insert(description.and_then(|d| d.id), kind, entity, creator)
    }
}
