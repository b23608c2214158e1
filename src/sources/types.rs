//! Common types and traits for sensor data sources.

use rand::{Rng, rngs::StdRng};

/// Contextual information passed to sources on each read.
///
/// # Fields
/// * `timestep` - Current control interval index
pub struct SourceContext {
    pub timestep: usize,
}

impl SourceContext {
    /// Creates a new SourceContext for the given timestep.
    pub fn new(timestep: usize) -> Self {
        Self { timestep }
    }
}

/// Capability that supplies the raw samples for one control interval.
///
/// The control core never generates its own inputs; whatever reads
/// dampers, zone thermostats, or an outdoor air sensor implements this trait
/// and is injected into the engine.
pub trait SampleSource {
    /// Returns the samples for the interval described by `context`.
    ///
    /// Values are passed through unvalidated; rejecting NaN or
    /// out-of-range readings is the aggregator's job.
    fn read(&mut self, context: &SourceContext) -> Vec<f64>;

    /// Returns a human-readable name for the source.
    fn source_type(&self) -> &'static str;
}

/// Draws `count` values uniformly from `[low, high)`.
///
/// Returns `low` repeated when the range is empty.
pub fn uniform_samples(rng: &mut StdRng, count: usize, low: f64, high: f64) -> Vec<f64> {
    if high <= low {
        return vec![low; count];
    }
    (0..count).map(|_| rng.random_range(low..high)).collect()
}
