//! Randomised edit simulator
//!
//! Drives a session through a seeded mix of constructions, corrections,
//! undos and redos. After every step it checks that:
//! 1. every back reference is symmetric (`check_references` is empty)
//! 2. a second rollforward changes nothing
//!
//! Rejected requests are expected; only errors the engine does not classify
//! as recoverable count as violations.

use crate::config::EditorConfig;
use crate::edit::{CircleObservation, Direction, EditKind};
use crate::error::EditError;
use crate::fields::{Field, FieldValue};
use crate::session::{ReferenceProblem, Session};
use crate::state_machine::OperationState;
use crate::types::{EditSequence, FeatureId, FeatureKind};
use cadastre_geom::Position;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;
use std::fmt::Write as _;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of simulated steps
    pub edits: u64,
    /// Stop at the first violation
    pub stop_on_first_violation: bool,
    /// Session configuration
    pub editor: EditorConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            edits: 500,
            stop_on_first_violation: true,
            editor: EditorConfig::default(),
        }
    }
}

/// Step kinds the simulator chooses between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedAction {
    /// Execute a new edit
    Execute,
    /// Correct an earlier edit
    Correct,
    /// Undo an edit
    Undo,
    /// Redo an undone edit
    Redo,
}

/// A violation detected during simulation
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// Cross references are out of step
    BrokenReferences {
        /// Step number
        step: u64,
        /// What is broken
        problems: Vec<ReferenceProblem>,
    },
    /// A repeated rollforward moved something
    RollforwardNotIdempotent {
        /// Step number
        step: u64,
    },
    /// The engine failed in a way it does not classify as recoverable
    UnexpectedError {
        /// Step number
        step: u64,
        /// What was attempted
        action: SimulatedAction,
        /// The error
        error: String,
    },
    /// The journal hash chain is broken
    JournalIntegrity,
}

/// Statistics for simulation
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    /// Steps that did something
    pub attempted: u64,
    /// Steps the engine accepted
    pub succeeded: u64,
    /// Steps the engine rejected as expected
    pub rejected: u64,
    /// Accepted corrections
    pub corrections: u64,
    /// Accepted undos
    pub undos: u64,
    /// Accepted redos
    pub redos: u64,
    /// Rollforwards that halted at a problem operation
    pub halted: u64,
}

/// Final report from simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration used
    pub config: SimulatorConfig,
    /// Counters
    pub stats: SimulatorStats,
    /// Violations found
    pub violations: Vec<Violation>,
    /// Active features at the end
    pub active_features: usize,
}

impl SimulatorReport {
    /// Did every check pass?
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Cadastre Edit Simulator Report ===\n");
        let _ = writeln!(report, "Seed: {}", self.config.seed);
        let _ = writeln!(report, "Steps Attempted: {}", self.stats.attempted);
        let _ = writeln!(report, "Steps Succeeded: {}", self.stats.succeeded);
        let _ = writeln!(report, "Steps Rejected: {}", self.stats.rejected);
        let _ = writeln!(report, "Corrections: {}", self.stats.corrections);
        let _ = writeln!(report, "Undos: {}", self.stats.undos);
        let _ = writeln!(report, "Redos: {}", self.stats.redos);
        let _ = writeln!(report, "Rollforward Halts: {}", self.stats.halted);
        let _ = writeln!(report, "Active Features: {}", self.active_features);
        let _ = writeln!(report, "Violations: {}", self.violations.len());

        if !self.violations.is_empty() {
            let _ = writeln!(report, "\n=== Violations ===");
            for (i, v) in self.violations.iter().enumerate() {
                let _ = writeln!(report, "{}. {:?}", i + 1, v);
            }
        }

        let _ = writeln!(
            report,
            "\n=== Result: {} ===",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        report
    }
}

/// Run the simulator
#[must_use]
pub fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut session = Session::new(config.editor.clone());
    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    for step in 0..config.edits {
        let Some((action, outcome)) = simulate_step(&mut rng, &mut session) else {
            continue;
        };
        stats.attempted += 1;
        match outcome {
            Ok(()) => {
                stats.succeeded += 1;
                match action {
                    SimulatedAction::Correct => stats.corrections += 1,
                    SimulatedAction::Undo => stats.undos += 1,
                    SimulatedAction::Redo => stats.redos += 1,
                    SimulatedAction::Execute => {}
                }
            }
            Err(err) if err.is_recoverable() => stats.rejected += 1,
            Err(err) => violations.push(Violation::UnexpectedError {
                step,
                action,
                error: err.to_string(),
            }),
        }
        if session.pending_problem().is_some() {
            stats.halted += 1;
        }

        let problems = session.check_references();
        if !problems.is_empty() {
            violations.push(Violation::BrokenReferences { step, problems });
        }

        // edits flagged behind a halted one may still be pending, so settle first
        session.rollforward(EditSequence(1));
        let before = session.snapshot();
        let again = session.rollforward(EditSequence(1));
        if !again.moved.is_empty() || session.snapshot() != before {
            violations.push(Violation::RollforwardNotIdempotent { step });
        }

        if config.stop_on_first_violation && !violations.is_empty() {
            break;
        }
    }

    if session.journal().verify_integrity().is_err() {
        violations.push(Violation::JournalIntegrity);
    }
    tracing::info!(
        "Simulated {} steps, {} violations",
        stats.attempted,
        violations.len()
    );

    SimulatorReport {
        active_features: session.store().active().count(),
        config,
        stats,
        violations,
    }
}

fn active_of(session: &Session, kind: FeatureKind) -> Vec<FeatureId> {
    session
        .store()
        .active()
        .filter(|f| f.kind() == kind)
        .map(|f| f.id())
        .collect()
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[rng.gen_range(0..items.len())])
    }
}

fn random_position(rng: &mut StdRng) -> Position {
    Position::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0))
}

/// Choose and perform one step; `None` when nothing suitable exists yet
fn simulate_step(
    rng: &mut StdRng,
    session: &mut Session,
) -> Option<(SimulatedAction, Result<(), EditError>)> {
    let roll = rng.gen_range(0..100);
    if roll < 70 {
        let kind = random_edit(rng, session, roll)?;
        Some((SimulatedAction::Execute, session.execute(kind).map(|_| ())))
    } else if roll < 85 {
        let (target, changes) = random_correction(rng, session)?;
        Some((
            SimulatedAction::Correct,
            session.correct(target, changes).map(|_| ()),
        ))
    } else if roll < 95 {
        let live: Vec<EditSequence> = session
            .operations()
            .filter(|op| op.state().is_live())
            .map(|op| op.sequence())
            .collect();
        let seq = pick(rng, &live)?;
        Some((SimulatedAction::Undo, session.undo(seq)))
    } else {
        let undone: Vec<EditSequence> = session
            .operations()
            .filter(|op| op.state() == OperationState::Undone)
            .map(|op| op.sequence())
            .collect();
        let seq = pick(rng, &undone)?;
        Some((SimulatedAction::Redo, session.redo(seq)))
    }
}

fn random_edit(rng: &mut StdRng, session: &Session, roll: u32) -> Option<EditKind> {
    let points = active_of(session, FeatureKind::Point);
    if points.len() < 2 || roll < 20 {
        return Some(EditKind::NewPoint {
            position: random_position(rng),
        });
    }
    let a = pick(rng, &points)?;
    let b = pick(rng, &points)?;
    let store = session.store();

    Some(match roll {
        20..=34 => EditKind::Radial {
            direction: Direction::new(a, rng.gen_range(0.0..TAU)),
            distance: rng.gen_range(1.0..100.0),
            add_line: rng.gen_bool(0.5),
        },
        35..=44 => {
            let span = store.position(a).ok()?.distance(&store.position(b).ok()?);
            EditKind::IntersectDistances {
                a: CircleObservation::new(a, span * rng.gen_range(0.4..1.2)),
                b: CircleObservation::new(b, span * rng.gen_range(0.4..1.2)),
                use_default: rng.gen_bool(0.5),
                add_lines: rng.gen_bool(0.3),
            }
        }
        45..=52 => EditKind::IntersectDirections {
            a: Direction::new(a, rng.gen_range(0.0..TAU)),
            b: Direction::new(b, rng.gen_range(0.0..TAU)),
            add_lines: false,
        },
        53..=61 => EditKind::NewLine {
            start: a,
            end: b,
            center: None,
            clockwise: false,
        },
        _ => {
            let lines = active_of(session, FeatureKind::Line);
            let line = pick(rng, &lines)?;
            let (_, _, shape) = store.line(line).ok()?;
            match roll {
                62..=65 => EditKind::SimpleLineSubdivision {
                    line,
                    distance: shape.length() * rng.gen_range(0.1..0.9),
                },
                66..=67 => EditKind::AttachPoint {
                    line,
                    position_ratio: rng.gen_range(0.1..0.9),
                    split: rng.gen_bool(0.5),
                },
                _ => EditKind::LineExtension {
                    line,
                    from_end: rng.gen_bool(0.5),
                    distance: rng.gen_range(1.0..50.0),
                    add_line: rng.gen_bool(0.5),
                },
            }
        }
    })
}

fn random_correction(rng: &mut StdRng, session: &Session) -> Option<(EditSequence, Vec<Field>)> {
    let candidates: Vec<(EditSequence, Field)> = session
        .operations()
        .filter(|op| op.state().is_live())
        .filter_map(|op| {
            let field = match op.kind() {
                EditKind::NewPoint { position } => Field::new(
                    "position",
                    FieldValue::Position(Position::new(
                        position.x + rng.gen_range(-5.0..5.0),
                        position.y + rng.gen_range(-5.0..5.0),
                    )),
                ),
                EditKind::Radial { distance, .. } => Field::new(
                    "distance",
                    FieldValue::Float(distance * rng.gen_range(0.8..1.2)),
                ),
                _ => return None,
            };
            Some((op.sequence(), field))
        })
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let (target, field) = candidates[rng.gen_range(0..candidates.len())].clone();
    Some((target, vec![field]))
}
