//! bas-ctl entry point: CLI wiring around the scenario runner.

use std::path::Path;
use std::process;

use bas_ctl::config::ScenarioConfig;
use bas_ctl::io::export::export_csv;
use bas_ctl::io::history::{load_history, load_trend, sample_week};
use bas_ctl::logging::init_tracing;
use bas_ctl::runner::{ScenarioRun, history_from_trend, run_scenario};
use bas_ctl::sim::types::StepResult;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    telemetry_out: Option<String>,
    history: Option<String>,
    trend: Option<String>,
    verbose: bool,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("bas-ctl: trim-and-respond reset and optimal start for air handlers");
    eprintln!();
    eprintln!("Usage: bas-ctl [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --telemetry-out <path>   Export tick records to CSV");
    eprintln!("  --history <path>         Warm-up history CSV (zone_temp,outdoor_temp,warmup_minutes)");
    eprintln!("  --trend <path>           Zone trend log CSV; warm-ups are extracted per [warmup]");
    eprintln!("  --verbose                Debug-level logging when RUST_LOG is unset");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after the run");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn value_of(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a {what} argument");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        telemetry_out: None,
        history: None,
        trend: None,
        verbose: false,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(value_of(&args, i, "--scenario", "path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value_of(&args, i, "--preset", "name"));
            }
            "--seed" => {
                i += 1;
                let raw = value_of(&args, i, "--seed", "u64");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--telemetry-out" => {
                i += 1;
                cli.telemetry_out = Some(value_of(&args, i, "--telemetry-out", "path"));
            }
            "--history" => {
                i += 1;
                cli.history = Some(value_of(&args, i, "--history", "path"));
            }
            "--trend" => {
                i += 1;
                cli.trend = Some(value_of(&args, i, "--trend", "path"));
            }
            "--verbose" | "-v" => {
                cli.verbose = true;
            }
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                i += 1;
                let raw = value_of(&args, i, "--port", "u16");
                if let Ok(p) = raw.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{raw}\" is not a valid u16");
                    process::exit(1);
                }
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

fn print_run(run: &ScenarioRun) {
    for l in &run.loops {
        println!("=== {} ===", l.label);
        for r in &l.results {
            println!("{r}");
        }
        println!("\n{}\n", l.kpi);
    }

    let os = &run.optimal_start;
    println!("=== optimal_start ===");
    println!("Method:            {:?}", os.method);
    println!(
        "Samples:           {} accepted, {} skipped",
        os.accepted, os.skipped
    );
    println!(
        "Coefficients:      alpha_a={:.4} alpha_b={:.4} alpha_d={:.4}",
        os.params.alpha_a, os.params.alpha_b, os.params.alpha_d
    );
    match os.lead.limited_by {
        Some(limit) => println!(
            "Lead time:         {:.1} min (raw {:.1}, held at {limit:?} limit)",
            os.lead.minutes, os.lead.raw_minutes
        ),
        None => println!("Lead time:         {:.1} min", os.lead.minutes),
    }
    match (os.occupancy, os.start_at) {
        (Some(occ), Some(start)) => {
            println!("Occupancy:         {}", occ.format("%Y-%m-%d %H:%M"));
            println!("Start conditioning: {}", start.format("%Y-%m-%d %H:%M"));
        }
        _ => println!("Occupancy:         not a scheduled day"),
    }
    for c in &os.commands {
        println!(
            "  {} {:?} -> {}",
            c.at.format("%H:%M"),
            c.domain,
            c.label
        );
    }
}

fn main() {
    let cli = parse_args();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("warning: {e}");
    }

    // --scenario takes priority, then --preset, then baseline default
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
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let mut history = match cli.history {
        Some(ref path) => match load_history(Path::new(path)) {
            Ok(samples) => samples,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        None if cli.trend.is_some() => Vec::new(),
        None => sample_week(),
    };
    // Trend-derived days are the newest and go last.
    if let Some(ref path) = cli.trend {
        let extracted = load_trend(Path::new(path))
            .map_err(|e| e.to_string())
            .and_then(|points| history_from_trend(&scenario, &points).map_err(|e| e.to_string()));
        match extracted {
            Ok(samples) => history.extend(samples),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    }

    let run = match run_scenario(&scenario, &history) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    print_run(&run);

    if let Some(ref path) = cli.telemetry_out {
        let loops: Vec<(&str, &[StepResult])> = run
            .loops
            .iter()
            .map(|l| (l.label, l.results.as_slice()))
            .collect();
        if let Err(e) = export_csv(&loops, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(bas_ctl::api::AppState::from(run));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(bas_ctl::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
