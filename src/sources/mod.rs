//! Injected sensor data sources.

/// Recorded-frame playback.
pub mod replay;
pub mod types;
/// Seeded uniform sensor simulation.
pub mod uniform;

// Re-export the main types for convenience
pub use replay::ReplaySource;
pub use types::SampleSource;
pub use types::SourceContext;
pub use uniform::UniformSensorArray;

/// Source selected by configuration.
///
/// An enum rather than a trait object so the engine stays statically
/// dispatched.
#[derive(Debug, Clone)]
pub enum SensorSource {
    Uniform(UniformSensorArray),
    Replay(ReplaySource),
}

impl SampleSource for SensorSource {
    fn read(&mut self, context: &SourceContext) -> Vec<f64> {
        match self {
            SensorSource::Uniform(s) => s.read(context),
            SensorSource::Replay(s) => s.read(context),
        }
    }

    fn source_type(&self) -> &'static str {
        match self {
            SensorSource::Uniform(s) => s.source_type(),
            SensorSource::Replay(s) => s.source_type(),
        }
    }
}
