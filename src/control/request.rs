//! Ranked request aggregation with top-K outlier exclusion.

use tracing::debug;

use crate::error::{ControlError, require_finite};

/// Counts "requests" among a set of zone samples after discarding the
/// highest-ranked outliers.
///
/// Samples are ranked descending. The first `ignore_count` entries are
/// ignored (a rogue zone cannot drive the whole AHU); the remainder are
/// evaluated against `threshold`.
///
/// # Examples
///
/// ```
/// use bas_ctl::control::request::RequestAggregator;
///
/// let agg = RequestAggregator::new(2, 0.85).unwrap();
/// let summary = agg.aggregate(&[0.9, 0.88, 0.86, 0.5, 0.4]).unwrap();
/// assert_eq!(summary.request_count, 1);
/// assert_eq!(summary.ignored, vec![0.9, 0.88]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestAggregator {
    ignore_count: usize,
    threshold: f64,
    valid_range: Option<(f64, f64)>,
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSummary {
    /// Top-ranked samples excluded from counting (descending).
    pub ignored: Vec<f64>,
    /// Remaining samples that were evaluated (descending).
    pub evaluated: Vec<f64>,
    /// Number of evaluated samples `>= threshold`.
    pub request_count: usize,
    /// Largest evaluated sample, `None` when nothing was evaluated.
    pub max_evaluated: Option<f64>,
}

impl RequestAggregator {
    /// Creates an aggregator.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` if `threshold` is not finite.
    pub fn new(ignore_count: usize, threshold: f64) -> Result<Self, ControlError> {
        require_finite("threshold", threshold)?;
        Ok(Self {
            ignore_count,
            threshold,
            valid_range: None,
        })
    }

    /// Restricts accepted samples to the physical range `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` if the bounds are not finite or `low > high`.
    pub fn with_valid_range(mut self, low: f64, high: f64) -> Result<Self, ControlError> {
        require_finite("valid_range.low", low)?;
        require_finite("valid_range.high", high)?;
        if low > high {
            return Err(ControlError::config(
                "valid_range",
                format!("low ({low}) must be <= high ({high})"),
            ));
        }
        self.valid_range = Some((low, high));
        Ok(self)
    }

    pub fn ignore_count(&self) -> usize {
        self.ignore_count
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Checks every sample before any ranking happens.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` for the first non-finite or
    /// out-of-range value.
    pub fn validate(&self, samples: &[f64]) -> Result<(), ControlError> {
        for (index, &value) in samples.iter().enumerate() {
            let in_range = self
                .valid_range
                .is_none_or(|(low, high)| (low..=high).contains(&value));
            if !value.is_finite() || !in_range {
                return Err(ControlError::InvalidSample { index, value });
            }
        }
        Ok(())
    }

    /// Ranks `samples`, drops the top `ignore_count`, and counts requests.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` if any sample is rejected by
    /// [`RequestAggregator::validate`]; no partial result is produced.
    pub fn aggregate(&self, samples: &[f64]) -> Result<RequestSummary, ControlError> {
        self.validate(samples)?;

        let mut ranked = samples.to_vec();
        ranked.sort_by(|a, b| b.total_cmp(a));

        let split = self.ignore_count.min(ranked.len());
        let evaluated = ranked.split_off(split);
        let ignored = ranked;

        let request_count = evaluated.iter().filter(|&&v| v >= self.threshold).count();
        let max_evaluated = evaluated.first().copied();

        debug!(
            ignored = ?ignored,
            max_evaluated = ?max_evaluated,
            request_count,
            "aggregated requests"
        );

        Ok(RequestSummary {
            ignored,
            evaluated,
            request_count,
            max_evaluated,
        })
    }
}
