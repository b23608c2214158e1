//! End-to-end runs of the binary against presets and scenario files.

use std::process::{Command, Output};

#[derive(Debug)]
struct Kpis {
    mean_setpoint: f64,
    total_requests: f64,
}

#[test]
fn scenario_files_run_via_cli_and_produce_distinct_dynamics() {
    let baseline = run_and_parse_kpis(&["--scenario", "scenarios/baseline.toml"]);
    let high = run_and_parse_kpis(&["--scenario", "scenarios/high_demand.toml"]);
    let low = run_and_parse_kpis(&["--scenario", "scenarios/low_demand.toml"]);

    assert!(
        high.total_requests > baseline.total_requests,
        "expected more requests under high demand: baseline={:?}, high={:?}",
        baseline,
        high
    );
    assert_eq!(low.total_requests, 0.0);
    assert!(
        low.mean_setpoint < baseline.mean_setpoint,
        "expected lower pressure without requests: baseline={:?}, low={:?}",
        baseline,
        low
    );
    assert!(high.mean_setpoint >= baseline.mean_setpoint);
}

#[test]
fn every_preset_runs() {
    for preset in ["baseline", "conservative", "fixed_response"] {
        let output = run(&["--preset", preset]);
        assert!(
            output.status.success(),
            "preset {preset} failed: stderr={}",
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("=== static_pressure ==="));
        assert!(stdout.contains("Lead time:"));
    }
}

#[test]
fn reduced_model_scenario_prints_start_time() {
    let output = run(&["--scenario", "scenarios/reduced_model.toml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("=== static_pressure ==="));
    assert!(stdout.contains("=== supply_air_temp ==="));
    assert!(stdout.contains("Start conditioning: 2024-01-09"));
    assert!(stdout.contains("DOAS_Off"));
    assert!(stdout.contains("Release_Control"));
}

#[test]
fn unknown_preset_exits_non_zero() {
    let output = run(&["--preset", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn invalid_scenario_reports_every_error() {
    let dir = std::env::temp_dir().join(format!("bas-ctl-invalid-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bad.toml");
    std::fs::write(
        &path,
        "[simulation]\nsteps = 0\n\n[pressure]\nmin = 2.0\n",
    )
    .unwrap();

    let output = run(&["--scenario", path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("simulation.steps"));
    assert!(stderr.contains("pressure.min"));
}

#[test]
fn telemetry_and_history_files() {
    let dir = std::env::temp_dir().join(format!("bas-ctl-io-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let history = dir.join("history.csv");
    std::fs::write(
        &history,
        "zone_temp,outdoor_temp,warmup_minutes\n48,12,120\n70,10,90\n50,10,118\n",
    )
    .unwrap();
    let telemetry = dir.join("ticks.csv");

    let output = run(&[
        "--scenario",
        "scenarios/baseline.toml",
        "--history",
        history.to_str().unwrap(),
        "--telemetry-out",
        telemetry.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 accepted, 1 skipped"));

    let csv = std::fs::read_to_string(&telemetry).unwrap();
    // header + 48 ticks for each of two loops
    assert_eq!(csv.lines().count(), 1 + 96);
}

#[test]
fn per_degree_scenario_is_held_to_earliest_start() {
    let output = run(&["--scenario", "scenarios/per_degree.toml"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Method:            PerDegree"));
    assert!(stdout.contains("Start conditioning: 2024-01-09 05:00"));
    assert!(stdout.contains("held at Early limit"));
    // 900 s at five-minute ticks.
    assert_eq!(stdout.matches("startup delay").count(), 1 + 3);
}

#[test]
fn trend_log_supplies_history() {
    let dir = std::env::temp_dir().join(format!("bas-ctl-trend-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let trend = dir.join("trend.csv");
    let mut csv = String::from("timestamp,SpaceTemp,OaTemp\n");
    for step in 0..288u32 {
        let temp = match step {
            0..=60 => 60.0,
            61..=70 => 60.0 + f64::from(step - 60),
            _ => 70.0,
        };
        let minutes = step * 5;
        csv.push_str(&format!(
            "2024-01-09 {:02}:{:02},{temp},20\n",
            minutes / 60,
            minutes % 60
        ));
    }
    std::fs::write(&trend, csv).unwrap();

    let output = run(&["--scenario", "scenarios/baseline.toml", "--trend", trend.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 accepted, 0 skipped"));

    let bad = dir.join("bad_trend.csv");
    std::fs::write(&bad, "timestamp,SpaceTemp,OaTemp\nyesterday,60,20\n").unwrap();
    let output = run(&["--trend", bad.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unrecognised timestamp"));
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bas-ctl"))
        .args(args)
        .output()
        .expect("bas-ctl process should run")
}

fn run_and_parse_kpis(args: &[&str]) -> Kpis {
    let output = run(args);
    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={} ",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    // The pressure loop is printed first.
    Kpis {
        mean_setpoint: parse_metric(&stdout, "Mean setpoint:"),
        total_requests: parse_metric(&stdout, "Total requests:"),
    }
}

fn parse_metric(stdout: &str, label: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))
        .unwrap_or_else(|| panic!("missing KPI line `{label}` in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid KPI format for line `{line}`"));

    raw.parse::<f64>()
        .unwrap_or_else(|_| panic!("failed parsing `{raw}` from KPI line `{line}`"))
}
