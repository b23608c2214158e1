//! Occupancy schedule used to gate overrides and optimal start.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

/// Weekly occupied window.
///
/// Both ends of the daily window are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancySchedule {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days: Vec<Weekday>,
}

impl Default for OccupancySchedule {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl OccupancySchedule {
    pub fn new(start: NaiveTime, end: NaiveTime, days: Vec<Weekday>) -> Self {
        Self { start, end, days }
    }

    pub fn is_occupied(&self, at: NaiveDateTime) -> bool {
        self.days.contains(&at.weekday()) && at.time() >= self.start && at.time() <= self.end
    }

    /// Like [`OccupancySchedule::is_occupied`] with the window opened
    /// `lead` earlier, as it is once optimal start has begun conditioning.
    pub fn is_occupied_with_lead(&self, at: NaiveDateTime, lead: Duration) -> bool {
        let shifted = at.checked_add_signed(lead).filter(|s| s.date() == at.date());
        if let Some(shifted) = shifted {
            if self.days.contains(&at.weekday()) && at.time() < self.start {
                return shifted.time() >= self.start;
            }
        }
        self.is_occupied(at)
    }

    /// Occupancy start on the date of `at`, if that date is a scheduled day.
    pub fn occupancy_on(&self, at: NaiveDateTime) -> Option<NaiveDateTime> {
        self.days
            .contains(&at.weekday())
            .then(|| at.date().and_time(self.start))
    }
}
