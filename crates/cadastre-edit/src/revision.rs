//! Revision items
//!
//! An update carries a set of named field values. Applying it swaps those
//! values with the ones currently held by the target edit, so the same item
//! set serves to apply, undo and redo the revision.

use crate::edit::EditKind;
use crate::error::FieldError;
use crate::fields::{Field, FieldValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named values exchanged with a revised edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateItems {
    items: IndexMap<String, FieldValue>,
}

impl UpdateItems {
    /// Build from a list of changed fields; a repeated name keeps the last value
    #[must_use]
    pub fn new(changes: &[Field]) -> Self {
        Self {
            items: changes
                .iter()
                .map(|f| (f.name.clone(), f.value.clone()))
                .collect(),
        }
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Are there no items?
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Value held for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.items.get(name)
    }

    /// Items as a field list
    #[must_use]
    pub fn to_fields(&self) -> Vec<Field> {
        self.items
            .iter()
            .map(|(name, value)| Field::new(name.clone(), value.clone()))
            .collect()
    }

    /// Swap the held values with those of `kind`
    ///
    /// Returns the edited kind; afterwards `self` holds the values `kind`
    /// had. Nothing changes if any item fails to apply.
    ///
    /// # Errors
    /// Returns error if a name is not a field of `kind` or a value has the
    /// wrong type
    pub fn exchange(&mut self, kind: &EditKind) -> Result<EditKind, FieldError> {
        let mut next = kind.clone();
        let mut previous = IndexMap::with_capacity(self.items.len());
        for (name, value) in &self.items {
            let old = next
                .get_field(name)
                .ok_or_else(|| FieldError::UnknownField(name.clone()))?;
            next = next.with_field(name, value.clone())?;
            previous.insert(name.clone(), old);
        }
        self.items = previous;
        Ok(next)
    }
}
