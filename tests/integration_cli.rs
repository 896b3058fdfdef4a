//! End-to-end tests of the command-line binary.

use std::process::{Command, Output};

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_server-room-sim"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("server-room-sim process should run")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("stdout should be valid UTF-8")
}

#[test]
fn quick_preset_prints_reports() {
    let stdout = stdout_of(&run_cli(&["--preset", "quick", "--sequential"]));
    assert!(stdout.contains("--- Monthly Cooling Cost (8 trials) ---"));
    assert!(stdout.contains("--- Thermal Safety"));
    assert!(stdout.contains("--- Case Temperature by Hour ---"));
    assert!(stdout.contains("Ownership"));
}

#[test]
fn scenario_file_selects_premium_tier() {
    let stdout = stdout_of(&run_cli(&[
        "--scenario",
        "scenarios/premium_week.toml",
        "--trials",
        "2",
    ]));
    assert!(stdout.contains("Premium (VRF)"));
    assert!(stdout.contains("(2 trials)"));
}

#[test]
fn tier_comparison_prints_savings() {
    let stdout = stdout_of(&run_cli(&[
        "--preset",
        "quick",
        "--trials",
        "3",
        "--tier",
        "economical",
        "--compare-tier",
        "premium",
    ]));
    assert!(stdout.contains("Economical (standard)"));
    assert!(stdout.contains("Premium (VRF)"));
    let saving_line = stdout
        .lines()
        .find(|l| l.starts_with("Mean cost saving:"))
        .expect("comparison printed");
    let pct: f64 = saving_line
        .trim_start_matches("Mean cost saving:")
        .trim()
        .trim_end_matches('%')
        .parse()
        .expect("percentage");
    assert!(pct > 0.0, "premium should save money, got {pct}%");
}

#[test]
fn trajectory_csv_goes_to_stdout_alone() {
    let stdout = stdout_of(&run_cli(&[
        "--preset",
        "quick",
        "--trials",
        "2",
        "--trajectory-csv",
    ]));
    let mut lines = stdout.lines();
    assert_eq!(
        lines.next(),
        Some("time_h,exterior_c,wall_c,air_c,server_c,case_c,cooling_power_w,cop,electrical_power_w,energy_kwh")
    );
    // 48 hours plus the initial sample
    assert_eq!(lines.count(), 49);
}

#[test]
fn unknown_preset_fails() {
    let output = run_cli(&["--preset", "arctic"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown preset"));
}

#[test]
fn bad_seed_fails() {
    let output = run_cli(&["--seed", "minus-one"]);
    assert!(!output.status.success());
}
