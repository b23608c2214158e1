//! Trim-and-respond setpoint controller.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::request::RequestAggregator;
use crate::error::{ControlError, require_finite};

/// How the response adjustment scales with the request count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    /// `response_unit * request_count`.
    #[default]
    Proportional,
    /// `response_unit` whenever at least one request is present.
    Fixed,
}

/// Sign of an applied adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increased,
    Decreased,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increased => write!(f, "increased"),
            Direction::Decreased => write!(f, "decreased"),
        }
    }
}

/// Bounded setpoint and its trim/respond parameters.
///
/// `trim_step` and `response_unit` carry their own sign: a static pressure
/// loop trims down (`-0.02`) and responds up (`+0.06`), while a supply air
/// temperature loop trims up (`+0.2`) and responds down (`-0.3`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub current_value: f64,
    pub min: f64,
    pub max: f64,
    pub trim_step: f64,
    pub response_unit: f64,
    /// Largest adjustment magnitude allowed per tick.
    pub max_step: f64,
}

/// Observability record for one tick, handed to the reporting layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Adjustment {
    pub previous_value: f64,
    pub new_value: f64,
    /// Adjustment before the `max_step` clamp.
    pub raw_adjustment: f64,
    /// Adjustment after the `max_step` clamp, before the range clamp.
    pub adjustment: f64,
    pub request_count: usize,
    pub direction: Direction,
}

impl Adjustment {
    pub fn magnitude(&self) -> f64 {
        self.adjustment.abs()
    }
}

/// Maintains a setpoint inside `[min, max]`, trimming it when nothing asks
/// for more and responding in proportion to the request count otherwise.
///
/// # Examples
///
/// ```
/// use bas_ctl::control::trim_respond::{ControlState, ResponsePolicy, TrimResponseController};
///
/// let state = ControlState {
///     current_value: 0.5,
///     min: 0.5,
///     max: 1.5,
///     trim_step: -0.02,
///     response_unit: 0.06,
///     max_step: 0.15,
/// };
/// let mut ctl = TrimResponseController::new(state, ResponsePolicy::Proportional).unwrap();
/// let adj = ctl.tick(3);
/// assert!((adj.new_value - 0.65).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct TrimResponseController {
    state: ControlState,
    policy: ResponsePolicy,
}

impl TrimResponseController {
    /// Creates a controller after validating the state.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` when any field is non-finite,
    /// `min > max`, `max_step < 0`, or `current_value` lies outside `[min, max]`.
    pub fn new(state: ControlState, policy: ResponsePolicy) -> Result<Self, ControlError> {
        require_finite("current_value", state.current_value)?;
        require_finite("min", state.min)?;
        require_finite("max", state.max)?;
        require_finite("trim_step", state.trim_step)?;
        require_finite("response_unit", state.response_unit)?;
        require_finite("max_step", state.max_step)?;

        if state.min > state.max {
            return Err(ControlError::config(
                "min",
                format!("must be <= max ({} > {})", state.min, state.max),
            ));
        }
        if state.max_step < 0.0 {
            return Err(ControlError::config(
                "max_step",
                format!("must be >= 0, got {}", state.max_step),
            ));
        }
        if !(state.min..=state.max).contains(&state.current_value) {
            return Err(ControlError::config(
                "current_value",
                format!(
                    "must lie within [{}, {}], got {}",
                    state.min, state.max, state.current_value
                ),
            ));
        }

        Ok(Self { state, policy })
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn policy(&self) -> ResponsePolicy {
        self.policy
    }

    pub fn current_value(&self) -> f64 {
        self.state.current_value
    }

    /// Signed adjustment for `request_count` before any clamping.
    pub fn raw_adjustment(&self, request_count: usize) -> f64 {
        match (request_count, self.policy) {
            (0, _) => self.state.trim_step,
            (n, ResponsePolicy::Proportional) => self.state.response_unit * n as f64,
            (_, ResponsePolicy::Fixed) => self.state.response_unit,
        }
    }

    /// Advances one control interval within the configured range.
    pub fn tick(&mut self, request_count: usize) -> Adjustment {
        let ceiling = self.state.max;
        self.apply(request_count, ceiling)
    }

    /// Advances one control interval with a tighter upper bound.
    ///
    /// The ceiling is itself clamped into `[min, max]`, so the state never
    /// leaves the configured range. A ceiling below the current value pulls
    /// the setpoint down by at most `max_step` per tick; the recorded
    /// adjustment is then the change actually applied.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` if `ceiling` is not finite;
    /// the state is left unchanged.
    pub fn tick_with_ceiling(
        &mut self,
        request_count: usize,
        ceiling: f64,
    ) -> Result<Adjustment, ControlError> {
        if !ceiling.is_finite() {
            return Err(ControlError::InvalidSample {
                index: 0,
                value: ceiling,
            });
        }
        let ceiling = ceiling.clamp(self.state.min, self.state.max);
        Ok(self.apply(request_count, ceiling))
    }

    /// Aggregates `samples` and ticks on the resulting request count.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` if the aggregator rejects the
    /// samples; the state is left unchanged.
    pub fn tick_samples(
        &mut self,
        aggregator: &RequestAggregator,
        samples: &[f64],
    ) -> Result<Adjustment, ControlError> {
        let summary = aggregator.aggregate(samples)?;
        Ok(self.tick(summary.request_count))
    }

    fn apply(&mut self, request_count: usize, ceiling: f64) -> Adjustment {
        let previous_value = self.state.current_value;
        let raw_adjustment = self.raw_adjustment(request_count);
        let max_step = self.state.max_step;
        let mut adjustment = raw_adjustment.clamp(-max_step, max_step);

        let floor = self.state.min.max(previous_value - max_step);
        let upper = ceiling.max(previous_value - max_step);
        let new_value = (previous_value + adjustment).clamp(floor, upper);
        // Ceiling pull-down: record the change actually applied.
        if new_value < previous_value && new_value < previous_value + adjustment {
            adjustment = new_value - previous_value;
        }
        self.state.current_value = new_value;

        let direction = if adjustment > 0.0 {
            Direction::Increased
        } else {
            Direction::Decreased
        };

        debug!(
            previous_value,
            new_value,
            raw_adjustment,
            adjustment,
            request_count,
            %direction,
            "trim-respond tick"
        );

        Adjustment {
            previous_value,
            new_value,
            raw_adjustment,
            adjustment,
            request_count,
            direction,
        }
    }
}
