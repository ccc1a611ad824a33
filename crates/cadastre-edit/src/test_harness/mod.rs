//! Test harness
//!
//! Seeded simulation of long editing sessions, used by the `simulate` CLI
//! subcommand and by the integration tests.

pub mod simulator;

pub use simulator::{
    run_simulator, SimulatedAction, SimulatorConfig, SimulatorReport, SimulatorStats, Violation,
};
