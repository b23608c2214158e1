//! Per-AHU trim-and-respond loop: source, aggregator, controller.

use tracing::{debug, warn};

use crate::control::{OutdoorReset, RequestAggregator, TrimResponseController};
use crate::error::ControlError;
use crate::sources::{SampleSource, SourceContext};

use super::scheduler::PeriodicTask;
use super::types::{SimConfig, StepResult};

/// Outdoor air sensor paired with the reset that turns its reading into a
/// setpoint ceiling.
#[derive(Debug, Clone)]
pub struct OutdoorLink<S: SampleSource> {
    pub source: S,
    pub reset: OutdoorReset,
}

/// One control loop of one air handler.
///
/// Generic over `S: SampleSource` for static dispatch. Each engine owns its
/// controller exclusively; running several AHUs means running several
/// engines.
pub struct Engine<S: SampleSource> {
    label: &'static str,
    config: SimConfig,
    source: S,
    aggregator: RequestAggregator,
    controller: TrimResponseController,
    outdoor: Option<OutdoorLink<S>>,
    startup_delay: usize,
}

impl<S: SampleSource> Engine<S> {
    /// Creates a new loop engine.
    ///
    /// # Arguments
    ///
    /// * `label` - Loop name used in logs and reports
    /// * `config` - Run timing
    /// * `source` - Supplier of the request samples (dampers, zone temps)
    /// * `aggregator` - Rogue-zone filter and request counter
    /// * `controller` - Trim-and-respond state machine
    pub fn new(
        label: &'static str,
        config: SimConfig,
        source: S,
        aggregator: RequestAggregator,
        controller: TrimResponseController,
    ) -> Self {
        Self {
            label,
            config,
            source,
            aggregator,
            controller,
            outdoor: None,
            startup_delay: 0,
        }
    }

    /// Holds the setpoint for the first `ticks` intervals after the air
    /// handler starts. No sensors are read during the delay.
    pub fn with_startup_delay(mut self, ticks: usize) -> Self {
        self.startup_delay = ticks;
        self
    }

    pub fn startup_delay(&self) -> usize {
        self.startup_delay
    }

    /// Caps the setpoint each tick with an outdoor-air reset ceiling.
    pub fn with_outdoor_reset(mut self, source: S, reset: OutdoorReset) -> Self {
        self.outdoor = Some(OutdoorLink { source, reset });
        self
    }

    /// Executes one interval, surfacing invalid input as an error.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` if the request samples or the
    /// outdoor reading are rejected. The controller state is not touched.
    pub fn try_step(&mut self, t: usize) -> Result<StepResult, ControlError> {
        if t < self.startup_delay {
            debug!(loop_name = self.label, tick = t, "startup delay");
            return Ok(StepResult::held(t, self.time_min(t), self.controller.current_value()));
        }
        let context = SourceContext::new(t);
        let ceiling = self.read_ceiling(&context)?;
        let samples = self.source.read(&context);
        let summary = self.aggregator.aggregate(&samples)?;

        let adj = match ceiling {
            Some(c) => self.controller.tick_with_ceiling(summary.request_count, c)?,
            None => self.controller.tick(summary.request_count),
        };

        Ok(StepResult {
            timestep: t,
            time_min: self.time_min(t),
            previous_value: adj.previous_value,
            new_value: adj.new_value,
            adjustment: adj.adjustment,
            direction: adj.direction,
            request_count: adj.request_count,
            ignored_count: summary.ignored.len(),
            max_evaluated: summary.max_evaluated,
            ceiling,
            rejected: false,
            held: false,
        })
    }

    /// Executes one interval, recording rejected input as a held tick.
    pub fn step(&mut self, t: usize) -> StepResult {
        match self.try_step(t) {
            Ok(result) => result,
            Err(e) => {
                warn!(loop_name = self.label, tick = t, error = %e, "tick rejected");
                StepResult::rejected(t, self.time_min(t), self.controller.current_value(), None)
            }
        }
    }

    /// Executes all intervals and returns the complete record.
    pub fn run(&mut self) -> Vec<StepResult> {
        let total = self.config.total_steps();
        let results: Vec<StepResult> = (0..total).map(|t| self.step(t)).collect();
        debug!(loop_name = self.label, ticks = results.len(), "run complete");
        results
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn controller(&self) -> &TrimResponseController {
        &self.controller
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    fn time_min(&self, t: usize) -> f64 {
        t as f64 * self.config.tick_minutes()
    }

    fn read_ceiling(&mut self, context: &SourceContext) -> Result<Option<f64>, ControlError> {
        let Some(link) = self.outdoor.as_mut() else {
            return Ok(None);
        };
        let reading = link.source.read(context);
        let oat = reading.first().copied().unwrap_or(f64::NAN);
        link.reset.try_value_at(oat).map(Some)
    }
}

impl<S: SampleSource> PeriodicTask for Engine<S> {
    type Output = StepResult;
    type Error = ControlError;

    fn tick(&mut self, t: usize) -> Result<StepResult, ControlError> {
        self.try_step(t)
    }
}
