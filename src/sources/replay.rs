use super::types::{SampleSource, SourceContext};

/// Replays recorded frames, one per timestep, wrapping at the end.
///
/// Useful for trend-log playback and for deterministic tests.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Vec<Vec<f64>>,
}

impl ReplaySource {
    pub fn new(frames: Vec<Vec<f64>>) -> Self {
        Self { frames }
    }

    /// A source that returns the same frame every interval.
    pub fn constant(frame: Vec<f64>) -> Self {
        Self {
            frames: vec![frame],
        }
    }
}

impl SampleSource for ReplaySource {
    fn read(&mut self, context: &SourceContext) -> Vec<f64> {
        if self.frames.is_empty() {
            return Vec::new();
        }
        self.frames[context.timestep % self.frames.len()].clone()
    }

    fn source_type(&self) -> &'static str {
        "Replay"
    }
}
