//! Calendar and hour-of-day features used to slice transition histories.
//!
//! The buckets are deliberately coarse: four parts of day, the calendar
//! month, and the weekday. Finer slicing fragments a subject's history
//! into slices too thin to fit.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// Part-of-day bucket. `Night` wraps midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// 05:00 up to but excluding 12:00.
    Morning,
    /// 12:00 up to but excluding 17:00.
    Afternoon,
    /// 17:00 up to but excluding 22:00.
    Evening,
    /// 22:00 through 04:59 the next day.
    Night,
}

impl TimeOfDay {
    /// Buckets an hour of day in `0..24`.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    /// Buckets the local hour of a timestamp.
    pub fn of(timestamp: &DateTime<FixedOffset>) -> Self {
        Self::from_hour(timestamp.hour())
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "morning"),
            TimeOfDay::Afternoon => write!(f, "afternoon"),
            TimeOfDay::Evening => write!(f, "evening"),
            TimeOfDay::Night => write!(f, "night"),
        }
    }
}

/// Calendar month of a timestamp, 1 through 12.
pub fn month_of(timestamp: &DateTime<FixedOffset>) -> u32 {
    timestamp.month()
}

/// Weekday of a timestamp in its local offset.
pub fn weekday_of(timestamp: &DateTime<FixedOffset>) -> Weekday {
    timestamp.weekday()
}

/// Local hour of a timestamp, 0 through 23.
pub fn hour_of(timestamp: &DateTime<FixedOffset>) -> u32 {
    timestamp.hour()
}
