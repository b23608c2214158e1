//! Lead time interpolated from the two most similar past mornings.

use super::model::{LeadTime, StartWindow};

/// Lead time used when no history is available.
pub const DEFAULT_LEAD_MINUTES: f64 = 60.0;

/// A past morning: outdoor temperature, zone temperature, and the pre-start
/// minutes that turned out to be right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartRecord {
    pub outdoor_temp: f64,
    pub zone_temp: f64,
    pub minutes: f64,
}

impl StartRecord {
    pub fn new(outdoor_temp: f64, zone_temp: f64, minutes: f64) -> Self {
        Self {
            outdoor_temp,
            zone_temp,
            minutes,
        }
    }
}

/// Inverse-distance interpolation over the nearest two records.
///
/// Distance is `|dOAT| + |dZone|`. A zero distance gets weight 1 rather
/// than infinity.
#[derive(Debug, Clone)]
pub struct InterpolatedStart {
    history: Vec<StartRecord>,
    window: StartWindow,
}

impl InterpolatedStart {
    pub fn new(history: Vec<StartRecord>, window: StartWindow) -> Self {
        Self { history, window }
    }

    /// Interpolated minutes, rounded half to even, before bounding.
    pub fn interpolate(&self, outdoor_temp: f64, zone_temp: f64) -> f64 {
        let mut ranked: Vec<(f64, f64)> = self
            .history
            .iter()
            .filter(|r| r.outdoor_temp.is_finite() && r.zone_temp.is_finite() && r.minutes.is_finite())
            .map(|r| {
                let distance =
                    (outdoor_temp - r.outdoor_temp).abs() + (zone_temp - r.zone_temp).abs();
                (distance, r.minutes)
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        match ranked.as_slice() {
            [] => DEFAULT_LEAD_MINUTES,
            [(_, minutes)] => *minutes,
            [(d1, m1), (d2, m2), ..] => {
                let w1 = if *d1 != 0.0 { 1.0 / d1 } else { 1.0 };
                let w2 = if *d2 != 0.0 { 1.0 / d2 } else { 1.0 };
                ((m1 * w1 + m2 * w2) / (w1 + w2)).round_ties_even()
            }
        }
    }

    /// Bounded lead time for the current conditions.
    pub fn estimate(&self, outdoor_temp: f64, zone_temp: f64) -> LeadTime {
        let raw_minutes = self.interpolate(outdoor_temp, zone_temp);
        let (minutes, limited_by) = self.window.bound(raw_minutes);
        LeadTime {
            raw_minutes,
            minutes,
            limited_by,
        }
    }
}
