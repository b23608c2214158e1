use rand::{SeedableRng, rngs::StdRng};

use super::types::{SampleSource, SourceContext, uniform_samples};

/// A bank of simulated sensors reporting independent uniform readings.
///
/// Stands in for VAV damper positions, zone temperatures, or an outdoor air
/// sensor when no plant is attached.
///
/// # Examples
///
/// ```
/// use bas_ctl::sources::{SampleSource, SourceContext, UniformSensorArray};
///
/// // Forty damper positions between 30% and 95% open.
/// let mut dampers = UniformSensorArray::new("VavDampers", 40, 0.3, 0.95, 42);
/// let positions = dampers.read(&SourceContext::new(0));
/// assert_eq!(positions.len(), 40);
/// assert!(positions.iter().all(|p| (0.3..0.95).contains(p)));
/// ```
#[derive(Debug, Clone)]
pub struct UniformSensorArray {
    name: &'static str,
    /// Number of sensors in the bank
    pub count: usize,
    /// Lowest reading (inclusive)
    pub low: f64,
    /// Highest reading (exclusive)
    pub high: f64,
    rng: StdRng,
}

impl UniformSensorArray {
    /// Creates a sensor bank.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs and reports
    /// * `count` - Number of readings per interval
    /// * `low` - Lower bound of the reading range
    /// * `high` - Upper bound of the reading range
    /// * `seed` - Random seed for reproducible readings
    pub fn new(name: &'static str, count: usize, low: f64, high: f64, seed: u64) -> Self {
        Self {
            name,
            count,
            low,
            high,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SampleSource for UniformSensorArray {
    fn read(&mut self, _context: &SourceContext) -> Vec<f64> {
        uniform_samples(&mut self.rng, self.count, self.low, self.high)
    }

    fn source_type(&self) -> &'static str {
        self.name
    }
}
