//! Online estimation of warm-up model coefficients.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::params::{HistoricalSample, ModelForm, ParameterState, raw_coefficients};
use crate::error::{ControlError, require_finite};

/// How raw per-sample coefficients are folded into the parameter state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SmoothingPolicy {
    /// Exponentially weighted average over the whole batch, newest sample
    /// weighted most. `smoothing` is the per-position weight `k`; when
    /// absent it is derived from the batch length as `min(4 / (n + 1), 1)`.
    BatchWeighted { smoothing: Option<f64> },
    /// `alpha <- alpha + lambda * (alpha_new - alpha)`, sample by sample.
    ForgettingFactor { lambda: f64 },
}

impl Default for SmoothingPolicy {
    fn default() -> Self {
        SmoothingPolicy::ForgettingFactor { lambda: 0.1 }
    }
}

/// Result of one estimation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateReport {
    /// Parameter state after the pass (also stored in the estimator).
    pub state: ParameterState,
    /// Number of samples that contributed.
    pub accepted: usize,
    /// One `DegenerateModelInput` per sample left out of smoothing.
    pub skipped: Vec<ControlError>,
    /// State after each accepted sample (forgetting factor) or the single
    /// batch result.
    pub trajectory: Vec<ParameterState>,
}

impl EstimateReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Fits [`ParameterState`] to historical warm-ups for a fixed occupied setpoint.
///
/// The estimator owns the state exclusively; [`ParameterEstimator::update`]
/// is the only mutation path and replaces the state wholesale.
#[derive(Debug, Clone)]
pub struct ParameterEstimator {
    setpoint: f64,
    policy: SmoothingPolicy,
    form: ModelForm,
    state: ParameterState,
    history_limit: Option<usize>,
}

impl ParameterEstimator {
    /// Creates an estimator seeded with `initial`.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` if the setpoint or seed is
    /// non-finite, `lambda` is outside `(0, 1)`, or a batch smoothing
    /// constant is outside `(0, 1]`.
    pub fn new(
        setpoint: f64,
        policy: SmoothingPolicy,
        form: ModelForm,
        initial: ParameterState,
    ) -> Result<Self, ControlError> {
        require_finite("setpoint", setpoint)?;
        if !initial.is_finite() {
            return Err(ControlError::config("initial", "coefficients must be finite"));
        }
        match policy {
            SmoothingPolicy::ForgettingFactor { lambda } => {
                if !(lambda > 0.0 && lambda < 1.0) {
                    return Err(ControlError::config(
                        "forgetting_factor",
                        format!("must be in (0, 1), got {lambda}"),
                    ));
                }
            }
            SmoothingPolicy::BatchWeighted { smoothing: Some(k) } => {
                if !(k > 0.0 && k <= 1.0) {
                    return Err(ControlError::config(
                        "smoothing",
                        format!("must be in (0, 1], got {k}"),
                    ));
                }
            }
            SmoothingPolicy::BatchWeighted { smoothing: None } => {}
        }
        Ok(Self {
            setpoint,
            policy,
            form,
            state: initial,
            history_limit: None,
        })
    }

    /// Only the newest `days` samples of each batch are used.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` if `days` is zero.
    pub fn with_history_limit(mut self, days: usize) -> Result<Self, ControlError> {
        if days == 0 {
            return Err(ControlError::config("max_days_of_data", "must be > 0"));
        }
        self.history_limit = Some(days);
        Ok(self)
    }

    pub fn history_limit(&self) -> Option<usize> {
        self.history_limit
    }

    pub fn state(&self) -> &ParameterState {
        &self.state
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn form(&self) -> ModelForm {
        self.form
    }

    /// Folds `samples` into the parameter state.
    ///
    /// Samples are ordered oldest first; with a history limit only the
    /// newest ones are considered. Degenerate samples are skipped and
    /// reported by their index in `samples`. If every sample is skipped the
    /// previous state is kept.
    pub fn update(&mut self, samples: &[HistoricalSample]) -> EstimateReport {
        let offset = match self.history_limit {
            Some(days) if samples.len() > days => samples.len() - days,
            _ => 0,
        };
        if offset > 0 {
            debug!(dropped = offset, "history limited to newest samples");
        }
        let recent = &samples[offset..];
        let mut raws = Vec::with_capacity(recent.len());
        let mut skipped = Vec::new();

        for (index, sample) in recent.iter().enumerate().map(|(i, s)| (i + offset, s)) {
            match raw_coefficients(sample, self.setpoint, self.form) {
                Ok(raw) => raws.push(raw),
                Err(reason) => {
                    warn!(index, reason, ?sample, "skipping degenerate historical sample");
                    skipped.push(ControlError::DegenerateModelInput { index, reason });
                }
            }
        }

        let trajectory = if raws.is_empty() {
            Vec::new()
        } else {
            match self.policy {
                SmoothingPolicy::ForgettingFactor { lambda } => {
                    let mut state = self.state;
                    raws.iter()
                        .map(|raw| {
                            state = ParameterState {
                                alpha_a: forget(state.alpha_a, raw.alpha_a, lambda),
                                alpha_b: forget(state.alpha_b, raw.alpha_b, lambda),
                                alpha_d: forget(state.alpha_d, raw.alpha_d, lambda),
                            };
                            state
                        })
                        .collect()
                }
                SmoothingPolicy::BatchWeighted { smoothing } => {
                    let k = smoothing.unwrap_or_else(|| default_smoothing(raws.len()));
                    let column = |f: fn(&ParameterState) -> f64| {
                        weighted_average(&raws.iter().map(f).collect::<Vec<_>>(), k)
                    };
                    vec![ParameterState {
                        alpha_a: column(|p| p.alpha_a),
                        alpha_b: column(|p| p.alpha_b),
                        alpha_d: column(|p| p.alpha_d),
                    }]
                }
            }
        };

        if let Some(last) = trajectory.last() {
            self.state = *last;
        }

        debug!(
            accepted = raws.len(),
            skipped = skipped.len(),
            alpha_a = self.state.alpha_a,
            alpha_b = self.state.alpha_b,
            alpha_d = self.state.alpha_d,
            "parameter update"
        );

        EstimateReport {
            state: self.state,
            accepted: raws.len(),
            skipped,
            trajectory,
        }
    }
}

fn forget(alpha: f64, alpha_new: f64, lambda: f64) -> f64 {
    alpha + lambda * (alpha_new - alpha)
}

/// Smoothing constant for a batch of `n` values.
pub fn default_smoothing(n: usize) -> f64 {
    if n == 0 {
        1.0
    } else {
        (2.0 / (n as f64 + 1.0) * 2.0).min(1.0)
    }
}

/// Full-history exponential average with smoothing constant `k`.
///
/// The newest value (last) gets weight `k`, the one before `k(1-k)`, and so
/// on; the oldest value additionally absorbs the leftover `(1-k)^n` so the
/// weights sum to one. Returns `0.0` for an empty slice.
pub fn weighted_average(values: &[f64], k: f64) -> f64 {
    let n = values.len();
    let Some(&oldest) = values.first() else {
        return 0.0;
    };
    let decay = 1.0 - k;
    let recent: f64 = values
        .iter()
        .rev()
        .enumerate()
        .map(|(age, v)| v * k * decay.powi(age as i32))
        .sum();
    recent + oldest * decay.powi(n as i32)
}
