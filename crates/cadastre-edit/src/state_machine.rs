//! Operation lifecycle
//!
//! ```text
//! Uncommitted -> Executing -> GeometryCalculated -> Completed
//! Completed -> Undone | SupersededByUpdate
//! SupersededByUpdate -> Completed      (last revision undone)
//! Undone -> Executing                  (redo)
//! ```

use crate::error::EditError;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    /// Constructed, nothing created yet
    Uncommitted,
    /// Output features exist without geometry
    Executing,
    /// Output geometry is set
    GeometryCalculated,
    /// Back references installed; part of the map
    Completed,
    /// Reverted; outputs are tombstones
    Undone,
    /// Completed and corrected by at least one live update
    SupersededByUpdate,
}

impl OperationState {
    /// Does the operation currently contribute to the map?
    #[inline]
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Completed | Self::SupersededByUpdate)
    }
}

/// Validate a lifecycle transition
///
/// # Errors
/// Returns error if `to` is not reachable from `from` in one step
pub fn validate_transition(from: OperationState, to: OperationState) -> Result<(), EditError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(EditError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: OperationState) -> Vec<OperationState> {
    use OperationState::*;
    match from {
        Uncommitted => vec![Executing],
        Executing => vec![GeometryCalculated],
        GeometryCalculated => vec![Completed],
        Completed => vec![Undone, SupersededByUpdate],
        SupersededByUpdate => vec![Completed],
        Undone => vec![Executing],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use OperationState::*;

    const ALL: [OperationState; 6] = [
        Uncommitted,
        Executing,
        GeometryCalculated,
        Completed,
        Undone,
        SupersededByUpdate,
    ];

    #[test]
    fn execute_path_is_allowed() {
        assert!(validate_transition(Uncommitted, Executing).is_ok());
        assert!(validate_transition(Executing, GeometryCalculated).is_ok());
        assert!(validate_transition(GeometryCalculated, Completed).is_ok());
        assert!(validate_transition(Completed, Undone).is_ok());
        assert!(validate_transition(Undone, Executing).is_ok());
    }

    #[test]
    fn shortcuts_are_rejected() {
        assert!(matches!(
            validate_transition(Uncommitted, Completed),
            Err(EditError::IllegalTransition { .. })
        ));
        assert!(validate_transition(SupersededByUpdate, Undone).is_err());
        assert!(validate_transition(Undone, Completed).is_err());
    }

    #[test]
    fn only_completed_states_are_live() {
        let live: Vec<_> = ALL.into_iter().filter(|s| s.is_live()).collect();
        assert_eq!(live, vec![Completed, SupersededByUpdate]);
    }

    proptest! {
        #[test]
        fn prop_validate_agrees_with_table(from in 0usize..6, to in 0usize..6) {
            let (from, to) = (ALL[from], ALL[to]);
            prop_assert_eq!(
                validate_transition(from, to).is_ok(),
                allowed_transitions(from).contains(&to)
            );
        }

        #[test]
        fn prop_no_self_loops(i in 0usize..6) {
            prop_assert!(validate_transition(ALL[i], ALL[i]).is_err());
        }
    }
}
