//! Config-driven construction and execution of a complete scenario.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, LoopConfig, ScenarioConfig, StartMethod};
use crate::control::{
    ControlState, OutdoorReset, RequestAggregator, TrimResponseController,
};
use crate::error::ControlError;
use crate::optimal_start::{
    HistoricalSample, InterpolatedStart, LeadTime, Limit, OptimalStartEstimator,
    ParameterEstimator, ParameterState, StartCommand, StartConditions, StartRecord, TrendPoint,
    WarmupDay, extract_warmups,
};
use crate::sim::command::{ActuatorDomain, Command};
use crate::sim::engine::Engine;
use crate::sim::kpi::KpiReport;
use crate::sim::types::{SimConfig, StepResult};
use crate::sources::{SensorSource, UniformSensorArray};

/// Seed offset for the zone temperature sensors.
const TEMPERATURE_SEED_OFFSET: u64 = 17;
/// Seed offset for the outdoor air sensor.
const OUTDOOR_SEED_OFFSET: u64 = 31;

/// Loop label for duct static pressure.
pub const STATIC_PRESSURE: &str = "static_pressure";
/// Loop label for supply air temperature.
pub const SUPPLY_AIR_TEMP: &str = "supply_air_temp";

/// Failure to set up or run a scenario.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Records and KPIs of one loop.
#[derive(Debug, Clone)]
pub struct LoopRun {
    pub label: &'static str,
    pub results: Vec<StepResult>,
    pub kpi: KpiReport,
}

/// An actuator write planned around the optimal start time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRecord {
    pub at: NaiveDateTime,
    pub domain: ActuatorDomain,
    pub command: Command,
    pub label: &'static str,
}

/// Outcome of estimating the warm-up model and predicting the lead time.
#[derive(Debug, Clone, Serialize)]
pub struct OptimalStartRun {
    pub method: StartMethod,
    pub params: ParameterState,
    pub accepted: usize,
    pub skipped: usize,
    pub conditions: StartConditions,
    pub lead: LeadTime,
    /// Occupancy start on the target date, if it is a scheduled day.
    pub occupancy: Option<NaiveDateTime>,
    pub start_at: Option<NaiveDateTime>,
    pub commands: Vec<CommandRecord>,
}

/// Everything a scenario run produced.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub sim: SimConfig,
    pub loops: Vec<LoopRun>,
    pub optimal_start: OptimalStartRun,
}

impl ScenarioRun {
    pub fn loop_named(&self, label: &str) -> Option<&LoopRun> {
        self.loops.iter().find(|l| l.label == label)
    }
}

/// Timing for the run. Call after [`ScenarioConfig::validate`].
pub fn sim_config(cfg: &ScenarioConfig) -> SimConfig {
    let s = &cfg.simulation;
    SimConfig::new(s.steps, s.tick_seconds, s.seed)
}

fn build_loop(
    label: &'static str,
    l: &LoopConfig,
    sim: &SimConfig,
    seed: u64,
) -> Result<Engine<SensorSource>, ControlError> {
    let controller = TrimResponseController::new(
        ControlState {
            current_value: l.initial,
            min: l.min,
            max: l.max,
            trim_step: l.trim,
            response_unit: l.response,
            max_step: l.max_step,
        },
        l.policy,
    )?;
    let mut aggregator = RequestAggregator::new(l.ignore_count, l.threshold)?;
    if let Some([low, high]) = l.valid_range {
        aggregator = aggregator.with_valid_range(low, high)?;
    }
    let sensors = UniformSensorArray::new(label, l.sensor_count, l.sensor_low, l.sensor_high, seed);
    let delay = l.startup_delay_seconds.div_ceil(sim.tick_seconds.max(1));
    Ok(Engine::new(
        label,
        sim.clone(),
        SensorSource::Uniform(sensors),
        aggregator,
        controller,
    )
    .with_startup_delay(usize::try_from(delay).unwrap_or(usize::MAX)))
}

/// Builds the duct static pressure loop fed by simulated damper positions.
///
/// # Errors
///
/// Returns `ControlError::Configuration` if the loop parameters are invalid.
pub fn build_pressure_engine(
    cfg: &ScenarioConfig,
    sim: &SimConfig,
) -> Result<Engine<SensorSource>, ControlError> {
    build_loop(STATIC_PRESSURE, &cfg.pressure, sim, sim.seed)
}

/// Builds the supply air temperature loop fed by simulated zone
/// temperatures, capped by the outdoor-air reset when configured.
///
/// # Errors
///
/// Returns `ControlError::Configuration` if the loop or reset parameters are invalid.
pub fn build_temperature_engine(
    cfg: &ScenarioConfig,
    sim: &SimConfig,
) -> Result<Engine<SensorSource>, ControlError> {
    let t = &cfg.temperature;
    let engine = build_loop(
        SUPPLY_AIR_TEMP,
        &t.as_loop(),
        sim,
        sim.seed.wrapping_add(TEMPERATURE_SEED_OFFSET),
    )?;
    let Some(r) = &t.outdoor_reset else {
        return Ok(engine);
    };
    let reset = OutdoorReset::new(r.oat_min, r.oat_max, r.value_at_min, r.value_at_max)?;
    let outdoor = UniformSensorArray::new(
        "OutdoorAir",
        1,
        r.sensor_low,
        r.sensor_high,
        sim.seed.wrapping_add(OUTDOOR_SEED_OFFSET),
    );
    Ok(engine.with_outdoor_reset(SensorSource::Uniform(outdoor), reset))
}

/// Fits the warm-up model to `history` and predicts the start time for
/// the configured conditions on `date`, using the configured method.
///
/// Only the newest `max_days_of_data` samples are used.
///
/// # Errors
///
/// Returns `RunError::Control` if estimator or window parameters are
/// invalid, a current condition is not finite, or a time span cannot be
/// represented.
pub fn estimate_start(
    cfg: &ScenarioConfig,
    history: &[HistoricalSample],
    date: NaiveDate,
) -> Result<OptimalStartRun, RunError> {
    let os = &cfg.optimal_start;
    let mut estimator = ParameterEstimator::new(
        os.setpoint,
        os.smoothing_policy(),
        os.model,
        ParameterState {
            alpha_a: os.alpha_a,
            alpha_b: os.alpha_b,
            alpha_d: os.alpha_d,
        },
    )?
    .with_history_limit(os.max_days_of_data)?;
    let report = estimator.update(history);
    if report.accepted == 0 && !history.is_empty() {
        warn!("no usable historical samples, keeping seed coefficients");
    }

    let window = os.start_window()?;
    let conditions = StartConditions {
        zone_temp: os.zone_temp,
        outdoor_temp: os.outdoor_temp,
        occupied_setpoint: os.setpoint,
    };

    let schedule = cfg.schedule.to_schedule()?;
    let occupancy = date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| schedule.occupancy_on(midnight));

    let (lead, start_at) = match os.method {
        StartMethod::Model => {
            let lead = OptimalStartEstimator::new(window, os.model)
                .estimate(&conditions, &report.state)?;
            (lead, occupancy.and_then(|occ| lead.start_time(occ)))
        }
        StartMethod::Interpolated => {
            let recent = &history[history.len().saturating_sub(os.max_days_of_data)..];
            let records = recent
                .iter()
                .map(|s| StartRecord::new(s.outdoor_temp, s.zone_temp, s.warmup_minutes))
                .collect();
            let lead = InterpolatedStart::new(records, window)
                .estimate(conditions.outdoor_temp, conditions.zone_temp);
            (lead, occupancy.and_then(|occ| lead.start_time(occ)))
        }
        StartMethod::PerDegree => {
            let rule = os.per_degree.to_rule();
            rule.validate()?;
            let earliest = os.per_degree.earliest()?;
            let mut lead = rule.estimate(conditions.zone_temp, &window);
            let start_at = occupancy.map(|occ| {
                let command = StartCommand::hold(occ, lead.start_time(occ), earliest);
                if command.held_to_earliest {
                    lead.minutes = (occ - command.at).num_seconds() as f64 / 60.0;
                    lead.limited_by = Some(Limit::Early);
                }
                command.at
            });
            (lead, start_at)
        }
    };
    if occupancy.is_some() && start_at.is_none() {
        warn!(lead_minutes = lead.minutes, "start time out of range, no commands planned");
    }

    let mut commands = Vec::new();
    if let Some(start) = start_at {
        let lead_span = span_seconds("lead_minutes", (lead.minutes * 60.0).round())?;
        let tick = span_seconds("tick_seconds", cfg.simulation.tick_seconds as f64)?;
        let before = start.checked_sub_signed(tick).ok_or_else(|| {
            ControlError::config("tick_seconds", "start time minus one tick is out of range")
        })?;
        for at in [before, start] {
            let occupied = schedule.is_occupied_with_lead(at, lead_span);
            for domain in [ActuatorDomain::Doas, ActuatorDomain::NightRecirc] {
                if let Some(command) = domain.decide(occupied, true) {
                    commands.push(CommandRecord {
                        at,
                        domain,
                        command,
                        label: domain.label(command),
                    });
                }
            }
        }
    }

    info!(
        method = ?os.method,
        lead_minutes = lead.minutes,
        limited_by = ?lead.limited_by,
        start_at = ?start_at,
        "optimal start"
    );

    Ok(OptimalStartRun {
        method: os.method,
        params: report.state,
        accepted: report.accepted,
        skipped: report.skipped_count(),
        conditions,
        lead,
        occupancy,
        start_at,
        commands,
    })
}

fn span_seconds(field: &'static str, seconds: f64) -> Result<TimeDelta, ControlError> {
    if !seconds.is_finite() {
        return Err(ControlError::config(field, format!("must be finite, got {seconds}")));
    }
    TimeDelta::try_seconds(seconds as i64)
        .ok_or_else(|| ControlError::config(field, format!("{seconds} s is out of range")))
}

/// Warm-up samples recovered from a zone trend log with the `[warmup]` settings.
///
/// # Errors
///
/// Returns `RunError::Config` for bad `[warmup]` settings, or
/// `RunError::Control` for a non-finite trend reading.
pub fn history_from_trend(
    cfg: &ScenarioConfig,
    points: &[TrendPoint],
) -> Result<Vec<HistoricalSample>, RunError> {
    let settings = cfg.warmup.to_settings()?;
    let days = extract_warmups(points, &settings)?;
    info!(points = points.len(), days = days.len(), "warm-ups extracted from trend log");
    Ok(days.iter().map(WarmupDay::sample).collect())
}

/// Runs every enabled loop and the optimal-start estimate.
///
/// Loops run independently; each owns its own controller and sensors.
///
/// # Errors
///
/// Returns `RunError` if any component rejects its configuration.
pub fn run_scenario(
    cfg: &ScenarioConfig,
    history: &[HistoricalSample],
) -> Result<ScenarioRun, RunError> {
    let sim = sim_config(cfg);
    let mut loops = Vec::new();

    if cfg.pressure.enabled {
        let mut engine = build_pressure_engine(cfg, &sim)?;
        loops.push(finish(engine.label(), engine.run()));
    }
    if cfg.temperature.enabled {
        let mut engine = build_temperature_engine(cfg, &sim)?;
        loops.push(finish(engine.label(), engine.run()));
    }

    let date = cfg
        .optimal_start
        .parsed_date()?
        .unwrap_or_else(|| Local::now().date_naive());
    let optimal_start = estimate_start(cfg, history, date)?;

    Ok(ScenarioRun {
        sim,
        loops,
        optimal_start,
    })
}

fn finish(label: &'static str, results: Vec<StepResult>) -> LoopRun {
    let kpi = KpiReport::from_results(&results);
    LoopRun {
        label,
        results,
        kpi,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::history::sample_week;

    fn dated(mut cfg: ScenarioConfig) -> ScenarioConfig {
        // A Monday.
        cfg.optimal_start.date = Some("2024-01-08".into());
        cfg
    }

    #[test]
    fn baseline_runs_both_loops() {
        let cfg = dated(ScenarioConfig::baseline());
        let run = run_scenario(&cfg, &sample_week()).unwrap();
        assert_eq!(run.loops.len(), 2);
        for l in &run.loops {
            assert_eq!(l.results.len(), cfg.simulation.steps);
            assert_eq!(l.kpi.ticks, cfg.simulation.steps);
        }
    }

    #[test]
    fn disabled_loop_is_skipped() {
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.temperature.enabled = false;
        let run = run_scenario(&cfg, &sample_week()).unwrap();
        assert!(run.loop_named(STATIC_PRESSURE).is_some());
        assert!(run.loop_named(SUPPLY_AIR_TEMP).is_none());
    }

    #[test]
    fn supply_air_respects_outdoor_ceiling() {
        let cfg = dated(ScenarioConfig::baseline());
        let run = run_scenario(&cfg, &sample_week()).unwrap();
        let sat = run.loop_named(SUPPLY_AIR_TEMP).unwrap();
        for r in sat.results.iter().filter(|r| !r.held) {
            let ceiling = r.ceiling.unwrap();
            assert!((60.0..=65.0).contains(&ceiling));
            let stepping_down = (r.previous_value - r.new_value - 1.0).abs() < 1e-9;
            assert!(r.new_value <= ceiling + 1e-9 || stepping_down);
            assert!((r.new_value - r.previous_value).abs() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn start_time_precedes_occupancy() {
        let cfg = dated(ScenarioConfig::baseline());
        let os = estimate_start(&cfg, &sample_week(), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
            .unwrap();
        let occ = os.occupancy.unwrap();
        let start = os.start_at.unwrap();
        assert!(start < occ);
        assert!(os.lead.minutes >= 10.0 && os.lead.minutes <= 180.0);
        assert_eq!(os.accepted, 7);
    }

    #[test]
    fn commands_release_at_start() {
        let cfg = dated(ScenarioConfig::baseline());
        let os = estimate_start(&cfg, &sample_week(), NaiveDate::from_ymd_opt(2024, 1, 8).unwrap())
            .unwrap();
        let start = os.start_at.unwrap();
        let before: Vec<&str> = os
            .commands
            .iter()
            .filter(|c| c.at < start)
            .map(|c| c.label)
            .collect();
        assert_eq!(before, vec!["DOAS_Off", "Dampers_Closed"]);
        assert!(os
            .commands
            .iter()
            .filter(|c| c.at == start)
            .all(|c| c.command == Command::Release));
    }

    #[test]
    fn weekend_has_no_start_time() {
        let cfg = ScenarioConfig::baseline();
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        let os = estimate_start(&cfg, &sample_week(), saturday).unwrap();
        assert_eq!(os.start_at, None);
        assert!(os.commands.is_empty());
    }

    #[test]
    fn startup_delay_holds_first_ticks() {
        let cfg = dated(ScenarioConfig::baseline());
        let run = run_scenario(&cfg, &sample_week()).unwrap();
        let held = |label| {
            run.loop_named(label)
                .unwrap()
                .results
                .iter()
                .take_while(|r| r.held)
                .count()
        };
        // 300 s and 600 s at five-minute ticks.
        assert_eq!(held(STATIC_PRESSURE), 1);
        assert_eq!(held(SUPPLY_AIR_TEMP), 2);
        let sp = &run.loop_named(STATIC_PRESSURE).unwrap().results;
        assert_eq!(sp[0].new_value, cfg.pressure.initial);
        assert_eq!(sp[0].max_evaluated, None);
        assert!(sp[1..].iter().all(|r| !r.held));
    }

    #[test]
    fn partial_tick_of_delay_rounds_up() {
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.simulation.tick_seconds = 240;
        let engine = build_pressure_engine(&cfg, &sim_config(&cfg)).unwrap();
        assert_eq!(engine.startup_delay(), 2);

        cfg.pressure.startup_delay_seconds = 0;
        let engine = build_pressure_engine(&cfg, &sim_config(&cfg)).unwrap();
        assert_eq!(engine.startup_delay(), 0);
    }

    #[test]
    fn history_window_drops_oldest_days() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.optimal_start.max_days_of_data = 7;
        let mut history = vec![HistoricalSample::new(30.0, -20.0, 400.0); 5];
        history.extend(sample_week());

        let windowed = estimate_start(&cfg, &history, monday).unwrap();
        let recent = estimate_start(&cfg, &sample_week(), monday).unwrap();
        assert_eq!(windowed.accepted, 7);
        assert_eq!(windowed.params, recent.params);
        assert_eq!(windowed.lead, recent.lead);
    }

    #[test]
    fn interpolated_method_uses_history_records() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.optimal_start.method = StartMethod::Interpolated;
        let os = estimate_start(&cfg, &sample_week(), monday).unwrap();

        let records = sample_week()
            .iter()
            .map(|s| StartRecord::new(s.outdoor_temp, s.zone_temp, s.warmup_minutes))
            .collect();
        let expected = InterpolatedStart::new(records, cfg.optimal_start.start_window().unwrap())
            .estimate(cfg.optimal_start.outdoor_temp, cfg.optimal_start.zone_temp);
        assert_eq!(os.method, StartMethod::Interpolated);
        assert_eq!(os.lead, expected);
        assert!(os.start_at.unwrap() < os.occupancy.unwrap());
    }

    #[test]
    fn per_degree_method_holds_to_earliest_start() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.optimal_start.method = StartMethod::PerDegree;
        let os = estimate_start(&cfg, &[], monday).unwrap();
        // 19 degrees below 68 at 10 min/degree, bounded to 180, then held
        // from 04:00 to the 05:00 earliest start.
        assert_eq!(os.lead.raw_minutes, 190.0);
        assert_eq!(os.lead.minutes, 120.0);
        assert_eq!(os.lead.limited_by, Some(Limit::Early));
        assert_eq!(os.start_at, monday.and_hms_opt(5, 0, 0));

        cfg.optimal_start.zone_temp = 65.0;
        let os = estimate_start(&cfg, &[], monday).unwrap();
        assert_eq!(os.lead.minutes, 30.0);
        assert_eq!(os.lead.limited_by, None);
        assert_eq!(os.start_at, monday.and_hms_opt(6, 30, 0));
    }

    #[test]
    fn oversized_tick_is_an_error_not_a_panic() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.simulation.tick_seconds = u64::MAX;
        assert!(matches!(
            estimate_start(&cfg, &sample_week(), monday),
            Err(RunError::Control(ControlError::Configuration { field: "tick_seconds", .. }))
        ));
    }

    #[test]
    fn trend_log_feeds_history() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let points: Vec<TrendPoint> = (0..288)
            .map(|i| TrendPoint {
                timestamp: midnight + TimeDelta::minutes(5 * i),
                space_temp: match i {
                    i64::MIN..=60 => 60.0,
                    61..=70 => 60.0 + (i - 60) as f64,
                    _ => 70.0,
                },
                outdoor_temp: 20.0,
            })
            .collect();
        let history = history_from_trend(&ScenarioConfig::baseline(), &points).unwrap();
        assert_eq!(history, vec![HistoricalSample::new(60.0, 20.0, 45.0)]);

        let mut cfg = ScenarioConfig::baseline();
        cfg.warmup.reading_time = "4am".into();
        assert!(matches!(
            history_from_trend(&cfg, &points),
            Err(RunError::Config(_))
        ));
    }

    #[test]
    fn invalid_loop_config_is_an_error() {
        let mut cfg = dated(ScenarioConfig::baseline());
        cfg.pressure.max_step = -1.0;
        assert!(matches!(
            run_scenario(&cfg, &[]),
            Err(RunError::Control(ControlError::Configuration { .. }))
        ));
    }
}
