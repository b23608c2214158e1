//! Optimal start: how long before occupancy conditioning must begin.
//!
//! [`estimator::ParameterEstimator`] fits the warm-up model to past
//! mornings; [`model::OptimalStartEstimator`] turns the fitted parameters
//! and current conditions into a bounded lead time. Two simpler lead-time
//! rules are provided alongside for sites without history, and
//! [`warmup`] recovers past warm-up durations from trend logs.

/// Online coefficient estimation with smoothing.
pub mod estimator;
/// Nearest-neighbour interpolated lead time.
pub mod interpolation;
/// Bounded lead-time prediction.
pub mod model;
pub mod params;
/// Runtime-per-degree lead time.
pub mod per_degree;
pub mod warmup;

pub use estimator::{EstimateReport, ParameterEstimator, SmoothingPolicy};
pub use interpolation::{InterpolatedStart, StartRecord};
pub use model::{
    LeadTime, Limit, MAX_LEAD_MINUTES, OptimalStartEstimator, StartConditions, StartWindow,
};
pub use params::{HistoricalSample, ModelForm, ParameterState};
pub use per_degree::{PerDegreeStart, StartCommand};
pub use warmup::{TrendPoint, WarmupDay, WarmupSettings, extract_warmups};
