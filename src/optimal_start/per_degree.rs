//! Fixed runtime-per-degree recovery estimate.

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::model::{LeadTime, StartWindow};
use crate::error::{ControlError, require_finite};

/// Traditional optimal start: minutes per degree outside the comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerDegreeStart {
    pub lower_comfort: f64,
    pub upper_comfort: f64,
    /// Minutes to cool the space by one degree.
    pub cooling_rate: f64,
    /// Minutes to heat the space by one degree.
    pub heating_rate: f64,
}

impl Default for PerDegreeStart {
    fn default() -> Self {
        Self {
            lower_comfort: 68.0,
            upper_comfort: 77.0,
            cooling_rate: 10.0,
            heating_rate: 10.0,
        }
    }
}

/// Command time produced by [`PerDegreeStart::command_time`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCommand {
    pub at: NaiveDateTime,
    /// `true` when the computed time was earlier than allowed and got pushed back.
    pub held_to_earliest: bool,
}

impl StartCommand {
    /// Holds `at` to the earliest allowed start on the occupancy date.
    ///
    /// `at = None` (a start too far back to represent) is always held.
    pub fn hold(occupancy: NaiveDateTime, at: Option<NaiveDateTime>, earliest: NaiveTime) -> Self {
        let floor = occupancy.date().and_time(earliest).min(occupancy);
        match at {
            Some(at) if at >= floor => StartCommand {
                at,
                held_to_earliest: false,
            },
            _ => StartCommand {
                at: floor,
                held_to_earliest: true,
            },
        }
    }
}

impl PerDegreeStart {
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` if a value is non-finite, the
    /// band is inverted, or a rate is negative.
    pub fn validate(&self) -> Result<(), ControlError> {
        require_finite("lower_comfort", self.lower_comfort)?;
        require_finite("upper_comfort", self.upper_comfort)?;
        require_finite("cooling_rate", self.cooling_rate)?;
        require_finite("heating_rate", self.heating_rate)?;
        if self.lower_comfort > self.upper_comfort {
            return Err(ControlError::config(
                "lower_comfort",
                "must be <= upper_comfort",
            ));
        }
        if self.cooling_rate < 0.0 || self.heating_rate < 0.0 {
            return Err(ControlError::config("rate", "must be >= 0"));
        }
        Ok(())
    }

    /// Whole minutes of lead time for the current space temperature.
    pub fn lead_minutes(&self, space_temp: f64) -> i64 {
        let minutes = if space_temp > self.upper_comfort {
            (space_temp - self.upper_comfort) * self.cooling_rate
        } else if space_temp < self.lower_comfort {
            (self.lower_comfort - space_temp) * self.heating_rate
        } else {
            0.0
        };
        minutes.trunc() as i64
    }

    /// Lead time bounded to `window`, for use alongside the other estimators.
    pub fn estimate(&self, space_temp: f64, window: &StartWindow) -> LeadTime {
        let raw_minutes = self.lead_minutes(space_temp) as f64;
        let (minutes, limited_by) = window.bound(raw_minutes);
        LeadTime {
            raw_minutes,
            minutes,
            limited_by,
        }
    }

    /// Start command for an occupancy time, never earlier than `earliest`
    /// on the occupancy date.
    pub fn command_time(
        &self,
        occupancy: NaiveDateTime,
        space_temp: f64,
        earliest: NaiveTime,
    ) -> StartCommand {
        let at = TimeDelta::try_minutes(self.lead_minutes(space_temp))
            .and_then(|lead| occupancy.checked_sub_signed(lead));
        StartCommand::hold(occupancy, at, earliest)
    }
}
