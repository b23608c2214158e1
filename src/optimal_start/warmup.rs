//! Warm-up durations recovered from zone temperature trend logs.
//!
//! Each day's coldest and warmest readings act as its unoccupied and
//! occupied thresholds. A warm-up starts on a steep rise clear of the
//! unoccupied threshold and ends once the zone is near the occupied one.
//! Isolated active readings are dropped with a centred rolling window.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use tracing::debug;

use super::params::HistoricalSample;
use crate::error::{ControlError, require_finite};

/// One row of a zone trend log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendPoint {
    pub timestamp: NaiveDateTime,
    pub space_temp: f64,
    pub outdoor_temp: f64,
}

/// Detection thresholds for [`extract_warmups`].
#[derive(Debug, Clone, PartialEq)]
pub struct WarmupSettings {
    /// Band around the daily thresholds (°F).
    pub proximity: f64,
    /// Rise between consecutive readings that marks a warm-up start (°F).
    pub steep_rise: f64,
    /// Centred window width; an active reading needs another active one inside it.
    pub rolling_window: usize,
    /// Trend interval in minutes.
    pub minutes_per_step: f64,
    /// Days left out of the analysis.
    pub excluded_days: Vec<Weekday>,
    /// Time of the zone/outdoor reading paired with each day's duration.
    pub reading_time: NaiveTime,
}

impl Default for WarmupSettings {
    fn default() -> Self {
        Self {
            proximity: 0.5,
            steep_rise: 0.6,
            rolling_window: 3,
            minutes_per_step: 5.0,
            excluded_days: vec![Weekday::Sat, Weekday::Sun, Weekday::Mon],
            reading_time: NaiveTime::from_hms_opt(4, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl WarmupSettings {
    /// # Errors
    ///
    /// Returns `ControlError::Configuration` for a non-finite or negative
    /// band, a zero window, or a non-positive step length.
    pub fn validate(&self) -> Result<(), ControlError> {
        require_finite("proximity", self.proximity)?;
        require_finite("steep_rise", self.steep_rise)?;
        require_finite("minutes_per_step", self.minutes_per_step)?;
        if self.proximity < 0.0 {
            return Err(ControlError::config("proximity", "must be >= 0"));
        }
        if self.rolling_window == 0 {
            return Err(ControlError::config("rolling_window", "must be > 0"));
        }
        if self.minutes_per_step <= 0.0 {
            return Err(ControlError::config("minutes_per_step", "must be > 0"));
        }
        Ok(())
    }
}

/// One analysed day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WarmupDay {
    pub date: NaiveDate,
    pub occupied_threshold: f64,
    pub unoccupied_threshold: f64,
    pub active_steps: usize,
    pub minutes: f64,
    /// Zone temperature at the reading time.
    pub zone_temp: f64,
    /// Outdoor temperature at the reading time.
    pub outdoor_temp: f64,
}

impl WarmupDay {
    /// The day as an estimator input.
    pub fn sample(&self) -> HistoricalSample {
        HistoricalSample::new(self.zone_temp, self.outdoor_temp, self.minutes)
    }
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    unoccupied: f64,
    occupied: f64,
}

/// Finds the warm-up period of every analysed day in `points`.
///
/// Points may arrive in any order. Days in `excluded_days`, and days with
/// no reading at exactly `reading_time`, are left out of the result.
///
/// # Errors
///
/// Returns `ControlError::Configuration` if `settings` are invalid, or
/// `ControlError::InvalidSample` for a non-finite temperature (index into
/// `points`).
pub fn extract_warmups(
    points: &[TrendPoint],
    settings: &WarmupSettings,
) -> Result<Vec<WarmupDay>, ControlError> {
    settings.validate()?;
    for (index, p) in points.iter().enumerate() {
        if let Some(&value) = [p.space_temp, p.outdoor_temp].iter().find(|v| !v.is_finite()) {
            return Err(ControlError::InvalidSample { index, value });
        }
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);

    let included = |date: NaiveDate| !settings.excluded_days.contains(&date.weekday());

    let mut thresholds: BTreeMap<NaiveDate, Thresholds> = BTreeMap::new();
    for p in sorted.iter().filter(|p| included(p.timestamp.date())) {
        thresholds
            .entry(p.timestamp.date())
            .and_modify(|t| {
                t.unoccupied = t.unoccupied.min(p.space_temp);
                t.occupied = t.occupied.max(p.space_temp);
            })
            .or_insert(Thresholds {
                unoccupied: p.space_temp,
                occupied: p.space_temp,
            });
    }

    // None for readings on excluded days.
    let mut flags: Vec<Option<bool>> = Vec::with_capacity(sorted.len());
    let mut active = false;
    let mut previous: Option<&TrendPoint> = None;
    for p in &sorted {
        let date = p.timestamp.date();
        let Some(t) = thresholds.get(&date) else {
            flags.push(None);
            previous = Some(p);
            continue;
        };
        let same_day = previous.filter(|q| q.timestamp.date() == date);
        if same_day.is_none() {
            active = false;
        }
        let steep = same_day.is_some_and(|q| p.space_temp - q.space_temp > settings.steep_rise)
            && p.space_temp >= t.unoccupied + settings.proximity;
        let near = (p.space_temp - t.occupied).abs() <= settings.proximity;
        if steep {
            active = true;
        }
        if near {
            active = false;
        }
        flags.push(Some(active));
        previous = Some(p);
    }

    let smoothed = smooth(&flags, settings.rolling_window);

    let mut days = Vec::new();
    for (&date, t) in &thresholds {
        let Some(reading) = sorted
            .iter()
            .find(|p| p.timestamp.date() == date && p.timestamp.time() == settings.reading_time)
        else {
            debug!(%date, "no reading at the reading time, day skipped");
            continue;
        };
        let active_steps = sorted
            .iter()
            .zip(&smoothed)
            .filter(|(p, on)| **on && p.timestamp.date() == date)
            .count();
        days.push(WarmupDay {
            date,
            occupied_threshold: t.occupied,
            unoccupied_threshold: t.unoccupied,
            active_steps,
            minutes: active_steps as f64 * settings.minutes_per_step,
            zone_temp: reading.space_temp,
            outdoor_temp: reading.outdoor_temp,
        });
    }

    debug!(points = sorted.len(), days = days.len(), "warm-up extraction");
    Ok(days)
}

/// Keeps an active flag only if its centred window is complete, lies on
/// analysed days, and holds at least two active readings.
fn smooth(flags: &[Option<bool>], window: usize) -> Vec<bool> {
    let left = window / 2;
    (0..flags.len())
        .map(|i| {
            if flags[i] != Some(true) || i < left || i - left + window > flags.len() {
                return false;
            }
            let span = &flags[i - left..i - left + window];
            span.iter().all(Option::is_some) && span.iter().filter(|f| **f == Some(true)).count() > 1
        })
        .collect()
}
