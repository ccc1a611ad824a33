//! `cadastre-edit` command line: script replay and simulation

use anyhow::{Context, Result};
use cadastre_edit::test_harness::{run_simulator, SimulatorConfig};
use cadastre_edit::{run_script, EditScript, EditorConfig, Feature, FeatureGeometry, Session};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("cadastre-edit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Cadastral editing engine")
        .subcommand_required(true)
        .subcommand(
            Command::new("replay")
                .about("Replay an edit script and print the active features")
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Edit script (JSON)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Editor configuration (TOML)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a seeded random editing simulation")
                .arg(
                    Arg::new("edits")
                        .long("edits")
                        .default_value("500")
                        .value_parser(value_parser!(u64))
                        .help("Number of simulated steps"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                ),
        );

    let matches = cli.get_matches();
    let outcome = match matches.subcommand() {
        Some(("replay", args)) => replay(args),
        Some(("simulate", args)) => Ok(simulate(args)),
        _ => Ok(false),
    };

    match outcome {
        Ok(passed) => std::process::exit(if passed { 0 } else { 1 }),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

fn replay(args: &ArgMatches) -> Result<bool> {
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let path = args
        .get_one::<PathBuf>("script")
        .context("--script is required")?;
    let script = EditScript::load(path)
        .with_context(|| format!("loading script {}", path.display()))?;

    let mut session = Session::new(config);
    let report = run_script(&mut session, &script).context("replaying script")?;
    let active: Vec<&Feature> = session.store().active().collect();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&active)?);
    } else {
        println!("Steps: {}", report.steps);
        println!("Edits: {}", report.executed.len());
        println!("Active features: {}", active.len());
        for feature in &active {
            println!("  {}", describe(feature));
        }
        for problem in &report.problems {
            println!(
                "Rollforward halted at edit {} ({}): {}",
                problem.sequence, problem.name, problem.reason
            );
        }
    }
    Ok(report.problems.is_empty())
}

fn describe(feature: &Feature) -> String {
    let what = match feature.geometry() {
        Some(FeatureGeometry::Point { position }) => format!("point {position}"),
        Some(FeatureGeometry::Line { start, end, shape }) => {
            format!("line {start} -> {end} length {:.3}", shape.length())
        }
        Some(FeatureGeometry::Text { position, text }) => format!("text {text:?} at {position}"),
        Some(FeatureGeometry::Polygon { ring, area }) => {
            format!("polygon of {} vertices area {area:.3}", ring.len())
        }
        None => "no geometry".to_string(),
    };
    format!("{} [{}] {what}", feature.id(), feature.entity.as_str())
}

fn simulate(args: &ArgMatches) -> bool {
    let config = SimulatorConfig {
        seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
        edits: args.get_one::<u64>("edits").copied().unwrap_or(500),
        ..SimulatorConfig::default()
    };
    println!("Running simulator: {} steps, seed {}", config.edits, config.seed);
    let report = run_simulator(config);
    println!("{}", report.generate_text());
    report.passed()
}
