//! Outdoor-air-temperature reset schedule.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, require_finite};

/// Linear reset between two outdoor air temperatures.
///
/// Below `oat_min` the value holds at `value_at_min`, above `oat_max` at
/// `value_at_max`, and in between it is interpolated.
///
/// # Examples
///
/// ```
/// use bas_ctl::control::reset::OutdoorReset;
///
/// // Supply air temperature ceiling: 65 F in cold weather, 60 F in hot weather.
/// let reset = OutdoorReset::new(60.0, 70.0, 65.0, 60.0).unwrap();
/// assert_eq!(reset.value_at(55.0), 65.0);
/// assert_eq!(reset.value_at(65.0), 62.5);
/// assert_eq!(reset.value_at(75.0), 60.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutdoorReset {
    oat_min: f64,
    oat_max: f64,
    value_at_min: f64,
    value_at_max: f64,
}

impl OutdoorReset {
    /// Creates a reset schedule.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` if any value is non-finite or
    /// `oat_min >= oat_max`.
    pub fn new(
        oat_min: f64,
        oat_max: f64,
        value_at_min: f64,
        value_at_max: f64,
    ) -> Result<Self, ControlError> {
        require_finite("oat_min", oat_min)?;
        require_finite("oat_max", oat_max)?;
        require_finite("value_at_min", value_at_min)?;
        require_finite("value_at_max", value_at_max)?;
        if oat_min >= oat_max {
            return Err(ControlError::config(
                "oat_min",
                format!("must be < oat_max ({oat_min} >= {oat_max})"),
            ));
        }
        Ok(Self {
            oat_min,
            oat_max,
            value_at_min,
            value_at_max,
        })
    }

    /// Interpolated value for the given outdoor air temperature.
    pub fn value_at(&self, oat: f64) -> f64 {
        if oat <= self.oat_min {
            self.value_at_min
        } else if oat >= self.oat_max {
            self.value_at_max
        } else {
            let frac = (oat - self.oat_min) / (self.oat_max - self.oat_min);
            self.value_at_min + (self.value_at_max - self.value_at_min) * frac
        }
    }

    /// Like [`OutdoorReset::value_at`] but rejects a non-finite reading.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` if `oat` is NaN or infinite.
    pub fn try_value_at(&self, oat: f64) -> Result<f64, ControlError> {
        if oat.is_finite() {
            Ok(self.value_at(oat))
        } else {
            Err(ControlError::InvalidSample {
                index: 0,
                value: oat,
            })
        }
    }
}
