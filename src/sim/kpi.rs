//! Post-hoc KPI computation from a loop's tick records.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Aggregate indicators for one control loop over a complete run.
///
/// Computed from `&[StepResult]` so the report always agrees with the
/// exported records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub ticks: usize,
    /// Ticks whose inputs were refused.
    pub rejected_ticks: usize,
    /// Ticks inside the startup delay.
    pub held_ticks: usize,
    /// Accepted ticks with no requests.
    pub trim_ticks: usize,
    /// Accepted ticks with at least one request.
    pub respond_ticks: usize,
    pub total_requests: usize,
    pub mean_setpoint: f64,
    pub min_setpoint: f64,
    pub max_setpoint: f64,
    /// Largest single-tick change actually applied.
    pub largest_step: f64,
}

impl KpiReport {
    /// Computes all KPIs from the complete tick record.
    pub fn from_results(results: &[StepResult]) -> Self {
        if results.is_empty() {
            return Self {
                ticks: 0,
                rejected_ticks: 0,
                held_ticks: 0,
                trim_ticks: 0,
                respond_ticks: 0,
                total_requests: 0,
                mean_setpoint: 0.0,
                min_setpoint: 0.0,
                max_setpoint: 0.0,
                largest_step: 0.0,
            };
        }

        let mut rejected = 0_usize;
        let mut held = 0_usize;
        let mut trims = 0_usize;
        let mut responds = 0_usize;
        let mut requests = 0_usize;
        let mut sum = 0.0_f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut largest = 0.0_f64;

        for r in results {
            sum += r.new_value;
            min = min.min(r.new_value);
            max = max.max(r.new_value);
            largest = largest.max((r.new_value - r.previous_value).abs());

            if r.rejected {
                rejected += 1;
            } else if r.held {
                held += 1;
            } else if r.request_count == 0 {
                trims += 1;
            } else {
                responds += 1;
                requests += r.request_count;
            }
        }

        Self {
            ticks: results.len(),
            rejected_ticks: rejected,
            held_ticks: held,
            trim_ticks: trims,
            respond_ticks: responds,
            total_requests: requests,
            mean_setpoint: sum / results.len() as f64,
            min_setpoint: min,
            max_setpoint: max,
            largest_step: largest,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "Ticks:             {} ({} trim, {} respond, {} rejected, {} held)",
            self.ticks, self.trim_ticks, self.respond_ticks, self.rejected_ticks, self.held_ticks
        )?;
        writeln!(f, "Total requests:    {}", self.total_requests)?;
        writeln!(f, "Mean setpoint:     {:.3}", self.mean_setpoint)?;
        writeln!(
            f,
            "Setpoint range:    {:.3} .. {:.3}",
            self.min_setpoint, self.max_setpoint
        )?;
        write!(f, "Largest step:      {:.3}", self.largest_step)
    }
}
