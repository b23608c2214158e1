//! Optimal-start lead time from the fitted warm-up model.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::params::{ModelForm, ParameterState};
use crate::error::{ControlError, require_finite};

/// Conditions at the moment the lead time is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartConditions {
    pub zone_temp: f64,
    pub outdoor_temp: f64,
    pub occupied_setpoint: f64,
}

/// Longest lead time a window may allow: one day.
pub const MAX_LEAD_MINUTES: f64 = 1440.0;

/// Allowed lead-time range in minutes before occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartWindow {
    /// Minimum pre-start (latest possible start).
    pub late_start_limit: f64,
    /// Maximum pre-start (earliest possible start).
    pub early_start_limit: f64,
}

impl Default for StartWindow {
    fn default() -> Self {
        Self {
            late_start_limit: 10.0,
            early_start_limit: 180.0,
        }
    }
}

impl StartWindow {
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` unless
    /// `0 <= late <= early <= MAX_LEAD_MINUTES`, both finite.
    pub fn new(late_start_limit: f64, early_start_limit: f64) -> Result<Self, ControlError> {
        require_finite("late_start_limit", late_start_limit)?;
        require_finite("early_start_limit", early_start_limit)?;
        if late_start_limit < 0.0 {
            return Err(ControlError::config("late_start_limit", "must be >= 0"));
        }
        if early_start_limit > MAX_LEAD_MINUTES {
            return Err(ControlError::config(
                "early_start_limit",
                format!("must be <= {MAX_LEAD_MINUTES}, got {early_start_limit}"),
            ));
        }
        if late_start_limit > early_start_limit {
            return Err(ControlError::config(
                "late_start_limit",
                format!("must be <= early_start_limit ({late_start_limit} > {early_start_limit})"),
            ));
        }
        Ok(Self {
            late_start_limit,
            early_start_limit,
        })
    }

    /// Clamps `minutes` into the window, mapping NaN to the early limit.
    pub fn bound(&self, minutes: f64) -> (f64, Option<Limit>) {
        if minutes.is_nan() || minutes > self.early_start_limit {
            (self.early_start_limit, Some(Limit::Early))
        } else if minutes < self.late_start_limit {
            (self.late_start_limit, Some(Limit::Late))
        } else {
            (minutes, None)
        }
    }
}

/// Which window edge a lead time was pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Late,
    Early,
}

/// A bounded lead time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeadTime {
    /// Model output before bounding.
    pub raw_minutes: f64,
    /// Minutes before occupancy to start conditioning.
    pub minutes: f64,
    pub limited_by: Option<Limit>,
}

impl LeadTime {
    /// Wall-clock start for the given occupancy time, to the nearest second.
    ///
    /// `None` if the lead time is not finite or the result leaves the
    /// representable date range.
    pub fn start_time(&self, occupancy: NaiveDateTime) -> Option<NaiveDateTime> {
        let seconds = (self.minutes * 60.0).round();
        if !seconds.is_finite() {
            return None;
        }
        let lead = TimeDelta::try_seconds(seconds as i64)?;
        occupancy.checked_sub_signed(lead)
    }
}

/// Predicts warm-up lead time:
///
/// ```text
/// t = alpha_a * (Tsp - Tz) + coupling + alpha_d
/// ```
///
/// bounded to the start window. See [`ModelForm`] for the coupling term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalStartEstimator {
    window: StartWindow,
    form: ModelForm,
}

impl OptimalStartEstimator {
    pub fn new(window: StartWindow, form: ModelForm) -> Self {
        Self { window, form }
    }

    pub fn window(&self) -> &StartWindow {
        &self.window
    }

    /// Computes the bounded lead time.
    ///
    /// Any finite parameter state yields a result inside the window.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidSample` if a condition is not finite.
    pub fn estimate(
        &self,
        conditions: &StartConditions,
        params: &ParameterState,
    ) -> Result<LeadTime, ControlError> {
        let inputs = [
            conditions.zone_temp,
            conditions.outdoor_temp,
            conditions.occupied_setpoint,
        ];
        if let Some((index, &value)) = inputs.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ControlError::InvalidSample { index, value });
        }

        let dz = conditions.occupied_setpoint - conditions.zone_temp;
        let doa = conditions.occupied_setpoint - conditions.outdoor_temp;
        let raw_minutes =
            params.alpha_a * dz + self.form.coupling(params.alpha_b, dz, doa) + params.alpha_d;
        let (minutes, limited_by) = self.window.bound(raw_minutes);

        debug!(raw_minutes, minutes, ?limited_by, "optimal start");

        Ok(LeadTime {
            raw_minutes,
            minutes,
            limited_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;

    fn conditions() -> StartConditions {
        StartConditions {
            zone_temp: 48.0,
            outdoor_temp: 12.0,
            occupied_setpoint: 70.0,
        }
    }

    fn params(alpha_a: f64, alpha_b: f64, alpha_d: f64) -> ParameterState {
        ParameterState {
            alpha_a,
            alpha_b,
            alpha_d,
        }
    }

    #[test]
    fn reduced_form_matches_worked_example() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Reduced);
        let lead = est.estimate(&conditions(), &params(5.0, 0.3, 0.0)).unwrap();
        assert!((lead.raw_minutes - 132.0).abs() < 1e-9);
        assert!((lead.minutes - 132.0).abs() < 1e-9);
        assert_eq!(lead.limited_by, None);
    }

    #[test]
    fn literal_form_keeps_outdoor_product() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Literal);
        let lead = est.estimate(&conditions(), &params(5.0, 0.3, 0.0)).unwrap();
        // 5 * 22 + 22 * 58
        assert!((lead.raw_minutes - 1386.0).abs() < 1e-9);
        assert_eq!(lead.minutes, 180.0);
        assert_eq!(lead.limited_by, Some(Limit::Early));
    }

    #[test]
    fn literal_offset_cancels_outdoor_product() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Literal);
        let lead = est
            .estimate(&conditions(), &params(5.0, 0.1, -1276.0))
            .unwrap();
        assert!((lead.minutes - 110.0).abs() < 1e-9);
    }

    #[test]
    fn zero_alpha_b_does_not_produce_nan() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Literal);
        let lead = est.estimate(&conditions(), &params(0.0, 0.0, -1200.0)).unwrap();
        assert!((lead.raw_minutes - 76.0).abs() < 1e-9);
    }

    #[test]
    fn warm_zone_clamps_to_late_limit() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Reduced);
        let warm = StartConditions {
            zone_temp: 72.0,
            ..conditions()
        };
        let lead = est.estimate(&warm, &params(5.0, 1.0, 0.0)).unwrap();
        assert_eq!(lead.minutes, 10.0);
        assert_eq!(lead.limited_by, Some(Limit::Late));
    }

    #[test]
    fn nan_condition_is_rejected() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Literal);
        let bad = StartConditions {
            outdoor_temp: f64::NAN,
            ..conditions()
        };
        assert!(matches!(
            est.estimate(&bad, &ParameterState::default()),
            Err(ControlError::InvalidSample { index: 1, .. })
        ));
    }

    #[test]
    fn overflow_to_nan_maps_to_early_limit() {
        let est = OptimalStartEstimator::new(StartWindow::default(), ModelForm::Reduced);
        let lead = est
            .estimate(&conditions(), &params(f64::MAX, 1.0, -f64::MAX))
            .unwrap();
        assert!(lead.minutes >= 10.0 && lead.minutes <= 180.0);
    }

    #[test]
    fn start_time_subtracts_lead() {
        let lead = LeadTime {
            raw_minutes: 90.0,
            minutes: 90.0,
            limited_by: None,
        };
        let occupancy = NaiveDate::from_ymd_opt(2024, 1, 8)
            .and_then(|d| d.and_hms_opt(7, 0, 0))
            .unwrap();
        let start = lead.start_time(occupancy).unwrap();
        assert_eq!(start.format("%H:%M").to_string(), "05:30");
    }

    #[test]
    fn start_time_out_of_range_is_none() {
        let lead = LeadTime {
            raw_minutes: 1e12,
            minutes: 1e12,
            limited_by: None,
        };
        let occupancy = NaiveDate::from_ymd_opt(2024, 1, 8)
            .and_then(|d| d.and_hms_opt(7, 0, 0))
            .unwrap();
        assert_eq!(lead.start_time(occupancy), None);
        let nan = LeadTime {
            minutes: f64::NAN,
            ..lead
        };
        assert_eq!(nan.start_time(occupancy), None);
    }

    #[test]
    fn window_validation() {
        assert!(StartWindow::new(10.0, 180.0).is_ok());
        assert!(StartWindow::new(200.0, 180.0).is_err());
        assert!(StartWindow::new(-1.0, 180.0).is_err());
        assert!(StartWindow::new(10.0, f64::INFINITY).is_err());
        assert!(StartWindow::new(1e12, 1e12).is_err());
        assert!(StartWindow::new(10.0, MAX_LEAD_MINUTES).is_ok());
    }

    proptest! {
        #[test]
        fn prop_lead_time_always_in_window(
            tz in -1e6f64..1e6,
            to in -1e6f64..1e6,
            tsp in -1e6f64..1e6,
            a in -1e12f64..1e12,
            b in -1e12f64..1e12,
            d in -1e12f64..1e12,
            literal in any::<bool>(),
        ) {
            let form = if literal { ModelForm::Literal } else { ModelForm::Reduced };
            let est = OptimalStartEstimator::new(StartWindow::default(), form);
            let c = StartConditions { zone_temp: tz, outdoor_temp: to, occupied_setpoint: tsp };
            let lead = est.estimate(&c, &params(a, b, d)).unwrap();
            prop_assert!(lead.minutes >= 10.0 && lead.minutes <= 180.0);
        }
    }
}
