//! Model coefficients and the historical observations they are fitted to.

use serde::{Deserialize, Serialize};

/// One past warm-up: indoor temperature at start, outdoor temperature, and
/// the measured minutes needed to reach the occupied setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub zone_temp: f64,
    pub outdoor_temp: f64,
    pub warmup_minutes: f64,
}

impl HistoricalSample {
    pub fn new(zone_temp: f64, outdoor_temp: f64, warmup_minutes: f64) -> Self {
        Self {
            zone_temp,
            outdoor_temp,
            warmup_minutes,
        }
    }

    fn is_finite(&self) -> bool {
        self.zone_temp.is_finite() && self.outdoor_temp.is_finite() && self.warmup_minutes.is_finite()
    }
}

/// Smoothed coefficients of the warm-up model.
///
/// * `alpha_a` - minutes to move the zone by one degree
/// * `alpha_b` - outdoor-temperature influence
/// * `alpha_d` - constant offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    pub alpha_a: f64,
    pub alpha_b: f64,
    pub alpha_d: f64,
}

impl Default for ParameterState {
    fn default() -> Self {
        Self {
            alpha_a: 10.0,
            alpha_b: 5.0,
            alpha_d: 0.0,
        }
    }
}

impl ParameterState {
    pub fn is_finite(&self) -> bool {
        self.alpha_a.is_finite() && self.alpha_b.is_finite() && self.alpha_d.is_finite()
    }
}

/// Shape of the outdoor coupling term shared by estimation and prediction.
///
/// `Literal` multiplies and divides by `alpha_b`, so `alpha_b` cancels and
/// the term reduces to `(Tsp - Tz)(Tsp - To)`. `Reduced` uses `(Tsp - Tz)`
/// alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelForm {
    #[default]
    Literal,
    Reduced,
}

impl ModelForm {
    /// Coupling term for zone delta `dz = Tsp - Tz` and outdoor delta `doa = Tsp - To`.
    pub fn coupling(self, alpha_b: f64, dz: f64, doa: f64) -> f64 {
        match self {
            ModelForm::Literal if alpha_b != 0.0 => alpha_b * dz * doa / alpha_b,
            ModelForm::Literal => dz * doa,
            ModelForm::Reduced => dz,
        }
    }
}

/// Tolerance under which a temperature delta or coefficient counts as zero.
pub const DEGENERATE_EPS: f64 = 1e-9;

/// Per-sample coefficients obtained by inverting the model.
///
/// Returns `Err(reason)` when the sample would divide by zero.
pub(crate) fn raw_coefficients(
    sample: &HistoricalSample,
    setpoint: f64,
    form: ModelForm,
) -> Result<ParameterState, &'static str> {
    if !sample.is_finite() {
        return Err("non-finite value");
    }
    let dz = setpoint - sample.zone_temp;
    let doa = setpoint - sample.outdoor_temp;
    if dz.abs() < DEGENERATE_EPS {
        return Err("setpoint equals zone temperature");
    }
    if doa.abs() < DEGENERATE_EPS {
        return Err("setpoint equals outdoor temperature");
    }

    let outcome = sample.warmup_minutes;
    let alpha_a = (outcome / dz).abs();
    let alpha_b = (outcome / (dz * doa)).abs();
    if alpha_b < DEGENERATE_EPS {
        return Err("zero outdoor coefficient");
    }
    let alpha_d = outcome - (alpha_a * dz + form.coupling(alpha_b, dz, doa));

    let raw = ParameterState {
        alpha_a,
        alpha_b,
        alpha_d,
    };
    if raw.is_finite() {
        Ok(raw)
    } else {
        Err("non-finite coefficient")
    }
}
