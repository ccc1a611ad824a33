//! Edit scripts
//!
//! A JSON list of engine actions, replayed against a session in order:
//!
//! ```json
//! { "steps": [
//!     { "op": "execute", "edit": { "kind": "new_point", "position": { "x": 0.0, "y": 0.0 } } },
//!     { "op": "undo", "sequence": 1 }
//! ] }
//! ```

use crate::edit::EditKind;
use crate::error::ScriptError;
use crate::factory::FeatureFactory;
use crate::fields::Field;
use crate::session::{ProblemOperation, Session};
use crate::types::{EditSequence, EntityType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Execute an edit
    Execute {
        /// The edit
        edit: EditKind,
        /// Entity tags by output name
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        entities: IndexMap<String, EntityType>,
    },
    /// Undo an edit
    Undo {
        /// Edit to undo
        sequence: EditSequence,
    },
    /// Redo an undone edit
    Redo {
        /// Edit to redo
        sequence: EditSequence,
    },
    /// Correct an earlier edit
    Correct {
        /// Edit to correct
        target: EditSequence,
        /// New field values
        changes: Vec<Field>,
    },
    /// Roll forward from an edit
    Rollforward {
        /// First edit to consider
        from: EditSequence,
    },
}

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    /// Steps, run in order
    pub steps: Vec<ScriptStep>,
}

impl EditScript {
    /// Parse a script from JSON text
    ///
    /// # Errors
    /// Returns error if the text is not a valid script
    pub fn from_json(text: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a script file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}

/// What a script run did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    /// Steps run
    pub steps: usize,
    /// Sequence numbers of executed edits and corrections
    pub executed: Vec<EditSequence>,
    /// Rollforwards that halted
    pub problems: Vec<ProblemOperation>,
}

/// Run every step of `script` against `session`
///
/// # Errors
/// Stops at the first step the engine rejects
pub fn run_script(session: &mut Session, script: &EditScript) -> Result<ScriptReport, ScriptError> {
    let mut report = ScriptReport::default();
    for (index, step) in script.steps.iter().enumerate() {
        let fail = |source| ScriptError::Step { index, source };
        match step {
            ScriptStep::Execute { edit, entities } => {
                let factory = entities
                    .iter()
                    .fold(FeatureFactory::new(), |f, (name, entity)| {
                        f.with_entity(name.clone(), entity.clone())
                    });
                let seq = session.execute_with(edit.clone(), &factory).map_err(fail)?;
                report.executed.push(seq);
            }
            ScriptStep::Undo { sequence } => session.undo(*sequence).map_err(fail)?,
            ScriptStep::Redo { sequence } => session.redo(*sequence).map_err(fail)?,
            ScriptStep::Correct { target, changes } => {
                let (seq, rollforward) = session.correct(*target, changes.clone()).map_err(fail)?;
                report.executed.push(seq);
                report.problems.extend(rollforward.problem);
            }
            ScriptStep::Rollforward { from } => {
                report.problems.extend(session.rollforward(*from).problem);
            }
        }
        // undoing or redoing an update rolls forward internally
        if let ScriptStep::Undo { .. } | ScriptStep::Redo { .. } = step {
            report.problems.extend(session.pending_problem().cloned());
        }
        report.steps += 1;
    }
    report.problems.dedup();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::types::FeatureId;
    use cadastre_geom::Position;

    const SCRIPT: &str = r#"{
        "steps": [
            { "op": "execute",
              "edit": { "kind": "new_point", "position": { "x": 0.0, "y": 0.0 } } },
            { "op": "execute",
              "edit": { "kind": "radial",
                        "direction": { "from": 1, "bearing": 0.0 },
                        "distance": 10.0, "add_line": true },
              "entities": { "line": "Boundary" } },
            { "op": "correct", "target": 2,
              "changes": [ { "name": "distance", "value": { "type": "float", "value": 15.0 } } ] },
            { "op": "undo", "sequence": 3 },
            { "op": "redo", "sequence": 3 }
        ]
    }"#;

    #[test]
    fn script_runs_in_order() {
        let script = EditScript::from_json(SCRIPT).unwrap();
        let mut session = Session::new(EditorConfig::default());
        let report = run_script(&mut session, &script).unwrap();
        assert_eq!(report.steps, 5);
        assert_eq!(report.executed, vec![EditSequence(1), EditSequence(2), EditSequence(3)]);
        assert!(report.problems.is_empty());

        let p = session.operation(EditSequence(2)).unwrap().output("point").unwrap();
        assert_eq!(session.store().position(p).unwrap(), Position::new(0.0, 15.0));
        let line = session.operation(EditSequence(2)).unwrap().output("line").unwrap();
        assert_eq!(session.feature(line).unwrap().entity.as_str(), "Boundary");
    }

    #[test]
    fn failing_step_is_reported_with_index() {
        let script = EditScript {
            steps: vec![ScriptStep::Undo { sequence: EditSequence(1) }],
        };
        let mut session = Session::new(EditorConfig::default());
        let err = run_script(&mut session, &script).unwrap_err();
        assert!(matches!(err, ScriptError::Step { index: 0, .. }));
        assert!(session.feature(FeatureId(1)).is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EditScript::load(dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
    }
}
