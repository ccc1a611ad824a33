//! Operation dependency graph
//!
//! An edge `a -> b` means edit `b` consumes something edit `a` produced (or
//! revises `a`). Because features can only be consumed after they exist,
//! every edge must run from a lower to a higher sequence number.

use crate::error::GraphError;
use crate::types::EditSequence;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed, Walker};
use petgraph::Direction;
use std::collections::BTreeSet;

/// Dependency graph of live operations
#[derive(Debug, Default, Clone)]
pub struct OperationGraph {
    inner: DiGraphMap<EditSequence, ()>,
}

impl OperationGraph {
    /// Create an empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation with the edits it depends on
    pub fn add_operation(
        &mut self,
        seq: EditSequence,
        depends_on: impl IntoIterator<Item = EditSequence>,
    ) {
        self.inner.add_node(seq);
        for from in depends_on {
            if from != seq {
                self.inner.add_edge(from, seq, ());
            }
        }
    }

    /// Replace the dependencies of an operation
    pub fn set_dependencies(
        &mut self,
        seq: EditSequence,
        depends_on: impl IntoIterator<Item = EditSequence>,
    ) {
        let old: Vec<_> = self
            .inner
            .neighbors_directed(seq, Direction::Incoming)
            .collect();
        for from in old {
            self.inner.remove_edge(from, seq);
        }
        self.add_operation(seq, depends_on);
    }

    /// Remove an operation and its edges
    pub fn remove_operation(&mut self, seq: EditSequence) {
        self.inner.remove_node(seq);
    }

    /// Is the operation in the graph?
    #[inline]
    #[must_use]
    pub fn contains(&self, seq: EditSequence) -> bool {
        self.inner.contains_node(seq)
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of dependency edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Every edit `seq` needs, directly or indirectly
    #[must_use]
    pub fn required_edits(&self, seq: EditSequence) -> BTreeSet<EditSequence> {
        if !self.contains(seq) {
            return BTreeSet::new();
        }
        let reversed = Reversed(&self.inner);
        Dfs::new(reversed, seq)
            .iter(reversed)
            .filter(|s| *s != seq)
            .collect()
    }

    /// Every edit that depends on `seq`, directly or indirectly
    #[must_use]
    pub fn dependent_edits(&self, seq: EditSequence) -> BTreeSet<EditSequence> {
        if !self.contains(seq) {
            return BTreeSet::new();
        }
        Dfs::new(&self.inner, seq)
            .iter(&self.inner)
            .filter(|s| *s != seq)
            .collect()
    }

    /// Check that every edge runs forward in sequence order
    ///
    /// # Errors
    /// Returns the first backwards edge
    pub fn validate_order(&self) -> Result<(), GraphError> {
        for (from, to, _) in self.inner.all_edges() {
            if from >= to {
                return Err(GraphError::OutOfOrder { from, to });
            }
        }
        Ok(())
    }

    /// Operations in dependency order
    ///
    /// # Errors
    /// Returns error if the graph has a cycle
    pub fn topological_order(&self) -> Result<Vec<EditSequence>, GraphError> {
        toposort(&self.inner, None).map_err(|_| GraphError::CycleDetected)
    }
}
