//! Core run types: timing configuration and the per-tick record.

use std::fmt;

use serde::Serialize;

use crate::control::Direction;

/// Run timing shared by every loop in a scenario.
///
/// # Examples
///
/// ```
/// use bas_ctl::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(12, 300, 42);
/// assert_eq!(cfg.tick_minutes(), 5.0);
/// assert_eq!(cfg.total_steps(), 12);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SimConfig {
    /// Number of control intervals to run.
    pub steps: usize,
    /// Length of one control interval in seconds.
    pub tick_seconds: u64,
    /// Master random seed for simulated sensors.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new run configuration.
    ///
    /// # Arguments
    ///
    /// * `steps` - Number of control intervals (must be > 0)
    /// * `tick_seconds` - Interval length in seconds (must be > 0)
    /// * `seed` - Master random seed
    ///
    /// # Panics
    ///
    /// Panics if `steps` or `tick_seconds` is zero.
    pub fn new(steps: usize, tick_seconds: u64, seed: u64) -> Self {
        assert!(steps > 0, "steps must be > 0");
        assert!(tick_seconds > 0, "tick_seconds must be > 0");
        Self {
            steps,
            tick_seconds,
            seed,
        }
    }

    pub fn total_steps(&self) -> usize {
        self.steps
    }

    pub fn tick_minutes(&self) -> f64 {
        self.tick_seconds as f64 / 60.0
    }
}

/// Complete record of one control interval of one loop.
///
/// A rejected tick (invalid samples) keeps the setpoint unchanged and
/// carries `rejected = true` with a zero adjustment. A tick inside the
/// startup delay does the same with `held = true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Interval index.
    pub timestep: usize,
    /// Elapsed minutes at the start of the interval.
    pub time_min: f64,
    pub previous_value: f64,
    pub new_value: f64,
    /// Signed change actually applied before range clamping.
    pub adjustment: f64,
    pub direction: Direction,
    pub request_count: usize,
    /// How many of the highest samples were discarded as rogue.
    pub ignored_count: usize,
    /// Largest sample that took part in the request count.
    pub max_evaluated: Option<f64>,
    /// Outdoor-reset ceiling in force for this tick, if any.
    pub ceiling: Option<f64>,
    pub rejected: bool,
    /// Tick fell inside the loop's startup delay.
    pub held: bool,
}

impl StepResult {
    /// Record for a tick whose inputs were refused.
    pub fn rejected(timestep: usize, time_min: f64, value: f64, ceiling: Option<f64>) -> Self {
        Self {
            timestep,
            time_min,
            previous_value: value,
            new_value: value,
            adjustment: 0.0,
            direction: Direction::Decreased,
            request_count: 0,
            ignored_count: 0,
            max_evaluated: None,
            ceiling,
            rejected: true,
            held: false,
        }
    }

    /// Record for a tick inside the startup delay.
    pub fn held(timestep: usize, time_min: f64, value: f64) -> Self {
        Self {
            rejected: false,
            held: true,
            ..Self::rejected(timestep, time_min, value, None)
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rejected {
            return write!(
                f,
                "t={:>3} ({:>6.1}m) | value={:>8.3} | REJECTED",
                self.timestep, self.time_min, self.new_value
            );
        }
        if self.held {
            return write!(
                f,
                "t={:>3} ({:>6.1}m) | value={:>8.3} | startup delay",
                self.timestep, self.time_min, self.new_value
            );
        }
        write!(
            f,
            "t={:>3} ({:>6.1}m) | {:>8.3} -> {:>8.3} ({:+.3}, {}) | requests={} ignored={}",
            self.timestep,
            self.time_min,
            self.previous_value,
            self.new_value,
            self.adjustment,
            self.direction,
            self.request_count,
            self.ignored_count,
        )?;
        if let Some(max) = self.max_evaluated {
            write!(f, " max={max:.3}")?;
        }
        if let Some(ceiling) = self.ceiling {
            write!(f, " ceiling={ceiling:.2}")?;
        }
        Ok(())
    }
}
