//! Server room simulator entry point: CLI wiring and report printing.

use std::fmt::Display;
use std::io;
use std::path::Path;
use std::process;

use server_room_sim::config::ScenarioConfig;
use server_room_sim::equipment::EquipmentTier;
use server_room_sim::io::export::write_trajectory_csv;
use server_room_sim::montecarlo::Batch;
use server_room_sim::stats::StrategyComparison;
use server_room_sim::telemetry::init_tracing;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    trials: Option<usize>,
    seed_override: Option<u64>,
    sequential: bool,
    workers: Option<usize>,
    tier: Option<EquipmentTier>,
    compare_tier: Option<EquipmentTier>,
    trajectory_csv: bool,
}

fn print_help() {
    eprintln!("server-room-sim: Monte Carlo cooling cost simulator for a server room");
    eprintln!();
    eprintln!("Usage: server-room-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --trials <n>             Override the number of trials");
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --sequential             Run trials on the calling thread");
    eprintln!("  --workers <n>            Cap the number of worker threads");
    eprintln!("  --tier <name>            Equipment tier (economical, efficient, premium)");
    eprintln!("  --compare-tier <name>    Run a second batch with this tier and compare");
    eprintln!("  --trajectory-csv         Write the first sample trajectory as CSV to stdout");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the reference preset is used.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=debug) to control diagnostic output.");
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str, what: &str) -> &'a str {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires {what}");
        process::exit(1);
    }
    &args[*i]
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str, what: &str) -> T {
    value.parse::<T>().unwrap_or_else(|_| {
        eprintln!("error: {flag} value \"{value}\" is not a valid {what}");
        process::exit(1);
    })
}

fn parse_tier(value: &str, flag: &str) -> EquipmentTier {
    EquipmentTier::from_name(value).unwrap_or_else(|| {
        eprintln!(
            "error: {flag} value \"{value}\" is not a tier (economical, efficient, premium)"
        );
        process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        trials: None,
        seed_override: None,
        sequential: false,
        workers: None,
        tier: None,
        compare_tier: None,
        trajectory_csv: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                cli.scenario_path =
                    Some(next_value(&args, &mut i, "--scenario", "a path argument").to_string());
            }
            "--preset" => {
                cli.preset =
                    Some(next_value(&args, &mut i, "--preset", "a name argument").to_string());
            }
            "--trials" => {
                let v = next_value(&args, &mut i, "--trials", "a count argument");
                cli.trials = Some(parse_number(v, "--trials", "count"));
            }
            "--seed" => {
                let v = next_value(&args, &mut i, "--seed", "a u64 argument");
                cli.seed_override = Some(parse_number(v, "--seed", "u64"));
            }
            "--sequential" => {
                cli.sequential = true;
            }
            "--workers" => {
                let v = next_value(&args, &mut i, "--workers", "a count argument");
                cli.workers = Some(parse_number(v, "--workers", "count"));
            }
            "--tier" => {
                let v = next_value(&args, &mut i, "--tier", "a tier name");
                cli.tier = Some(parse_tier(v, "--tier"));
            }
            "--compare-tier" => {
                let v = next_value(&args, &mut i, "--compare-tier", "a tier name");
                cli.compare_tier = Some(parse_tier(v, "--compare-tier"));
            }
            "--trajectory-csv" => {
                cli.trajectory_csv = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Prints a report block to stdout, or to stderr while stdout carries CSV.
fn emit(to_stderr: bool, block: impl Display) {
    if to_stderr {
        eprintln!("{block}\n");
    } else {
        println!("{block}\n");
    }
}

fn run_or_exit(scenario: &ScenarioConfig) -> Batch {
    scenario.run().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

fn report(scenario: &ScenarioConfig, batch: &Batch, to_stderr: bool) {
    let equipment = scenario.equipment.resolve();
    emit(
        to_stderr,
        format!(
            "=== {} | {} of {} trials succeeded (failure ratio {:.1}%, {} timed out) ===",
            equipment.name,
            batch.successful(),
            batch.attempted,
            100.0 * batch.failure_ratio(),
            batch.timed_out_count,
        ),
    );
    if let Some(stats) = batch.cost_stats() {
        emit(to_stderr, stats);
    }
    emit(
        to_stderr,
        format!(
            "Ownership (amortized + maintenance): ${:.2}/month",
            equipment.monthly_ownership_usd()
        ),
    );
    if let Some(safety) = batch.safety() {
        emit(to_stderr, safety);
    }
    if let Some(temps) = batch.temperature_stats() {
        emit(to_stderr, temps);
    }
}

fn main() {
    init_tracing();
    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then the reference default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::reference()
    };

    // Apply overrides
    if let Some(trials) = cli.trials {
        scenario.simulation.trials = trials;
    }
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = Some(seed);
    }
    if cli.sequential {
        scenario.simulation.parallel = false;
    }
    if let Some(workers) = cli.workers {
        scenario.simulation.workers = Some(workers);
    }
    if let Some(tier) = cli.tier {
        scenario = scenario.with_tier(tier);
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let to_stderr = cli.trajectory_csv;
    let batch = run_or_exit(&scenario);
    report(&scenario, &batch, to_stderr);

    if let Some(tier) = cli.compare_tier {
        let alternative = scenario.with_tier(tier);
        let other = run_or_exit(&alternative);
        report(&alternative, &other, to_stderr);
        if let (Some(a), Some(b)) = (batch.cost_stats(), other.cost_stats()) {
            emit(to_stderr, StrategyComparison::compare(&a, &b));
        }
    }

    if cli.trajectory_csv {
        let Some(trajectory) = batch.sample_trajectories.first() else {
            eprintln!("error: no sample trajectory retained (simulation.trajectory_samples = 0)");
            process::exit(1);
        };
        if let Err(e) = write_trajectory_csv(trajectory, io::stdout().lock()) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
    }
}
