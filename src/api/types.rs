//! API response and query types.
//!
//! Record fields mirror the CSV export columns.

use serde::{Deserialize, Serialize};

use crate::control::Direction;
use crate::sim::kpi::KpiReport;
use crate::sim::types::{SimConfig, StepResult};

/// Run timing plus a summary of every loop.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub config: SimConfig,
    pub loops: Vec<LoopSummary>,
}

/// KPIs and most recent tick of one loop.
#[derive(Debug, Serialize)]
pub struct LoopSummary {
    #[serde(rename = "loop")]
    pub label: &'static str,
    pub kpi: KpiReport,
    /// `None` for a loop that has not ticked.
    pub latest_step: Option<TelemetryRecord>,
}

/// Single tick record tagged with its loop.
#[derive(Debug, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "loop")]
    pub label: &'static str,
    pub timestep: usize,
    pub time_min: f64,
    pub previous_value: f64,
    pub new_value: f64,
    pub adjustment: f64,
    pub direction: Direction,
    pub request_count: usize,
    pub ignored_count: usize,
    pub max_evaluated: Option<f64>,
    pub ceiling: Option<f64>,
    pub rejected: bool,
    pub held: bool,
}

impl TelemetryRecord {
    pub fn new(label: &'static str, r: &StepResult) -> Self {
        Self {
            label,
            timestep: r.timestep,
            time_min: r.time_min,
            previous_value: r.previous_value,
            new_value: r.new_value,
            adjustment: r.adjustment,
            direction: r.direction,
            request_count: r.request_count,
            ignored_count: r.ignored_count,
            max_evaluated: r.max_evaluated,
            ceiling: r.ceiling,
            rejected: r.rejected,
            held: r.held,
        }
    }
}

/// Query parameters for `GET /telemetry`.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Only this loop's records.
    #[serde(rename = "loop")]
    pub loop_name: Option<String>,
    /// Start timestep (inclusive).
    pub from: Option<usize>,
    /// End timestep (inclusive).
    pub to: Option<usize>,
}

/// Error body for 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
