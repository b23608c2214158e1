//! Error kinds raised by the control core.

use thiserror::Error;

/// Failures surfaced by the aggregator, controllers, and estimators.
///
/// Tick-time errors (`InvalidSample`) leave the caller's state untouched.
/// `Configuration` is only ever returned from constructors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// A non-finite or out-of-physical-range input value.
    #[error("invalid sample at index {index}: {value}")]
    InvalidSample { index: usize, value: f64 },

    /// A historical sample that would divide by zero during coefficient derivation.
    #[error("degenerate model input at sample {index}: {reason}")]
    DegenerateModelInput { index: usize, reason: &'static str },

    /// A construction-time parameter violates its constraint.
    #[error("configuration error: {field} {message}")]
    Configuration {
        field: &'static str,
        message: String,
    },
}

impl ControlError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            message: message.into(),
        }
    }
}

/// Returns a configuration error when `value` is not finite.
pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<(), ControlError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ControlError::config(field, format!("must be finite, got {value}")))
    }
}
