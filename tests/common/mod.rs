//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use bas_ctl::config::ScenarioConfig;
use bas_ctl::control::{ControlState, RequestAggregator, ResponsePolicy, TrimResponseController};
use bas_ctl::optimal_start::HistoricalSample;
use bas_ctl::sim::engine::Engine;
use bas_ctl::sim::types::SimConfig;
use bas_ctl::sources::ReplaySource;

/// Static pressure state (0.5–1.5 in. WC) starting at `current`.
pub fn pressure_state(current: f64) -> ControlState {
    ControlState {
        current_value: current,
        min: 0.5,
        max: 1.5,
        trim_step: -0.02,
        response_unit: 0.06,
        max_step: 0.15,
    }
}

/// Supply air temperature state (55–65 °F) starting at `current`.
pub fn sat_state(current: f64) -> ControlState {
    ControlState {
        current_value: current,
        min: 55.0,
        max: 65.0,
        trim_step: 0.2,
        response_unit: -0.3,
        max_step: 1.0,
    }
}

pub fn pressure_controller(current: f64) -> TrimResponseController {
    TrimResponseController::new(pressure_state(current), ResponsePolicy::Proportional)
        .expect("pressure state is valid")
}

/// Damper aggregator: ignore the two most-open dampers, request at 85% open.
pub fn damper_aggregator() -> RequestAggregator {
    RequestAggregator::new(2, 0.85)
        .and_then(|a| a.with_valid_range(0.0, 1.0))
        .expect("damper aggregator is valid")
}

/// Static pressure engine replaying `frames` of damper positions.
pub fn replay_pressure_engine(frames: Vec<Vec<f64>>) -> Engine<ReplaySource> {
    Engine::new(
        "static_pressure",
        SimConfig::new(frames.len().max(1), 300, 0),
        ReplaySource::new(frames),
        damper_aggregator(),
        pressure_controller(1.0),
    )
}

/// Baseline scenario pinned to a Monday so start times are deterministic.
pub fn dated_baseline() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.optimal_start.date = Some("2024-01-08".into());
    cfg
}

/// One morning: zone 48 °F, outdoor 12 °F, 120 minutes to reach 70 °F.
pub fn cold_morning() -> HistoricalSample {
    HistoricalSample::new(48.0, 12.0, 120.0)
}
