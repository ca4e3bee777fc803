//! Anchor-point identification over location visits.
//!
//! Classifies which locations qualify as candidate anchors (home, work) by
//! overlapping each visit against a configured time-of-day window. Two
//! coverage modes share one contract:
//! - **sparse**: permissive boolean masks on arrival/departure hours, suited
//!   to patchy collection;
//! - **dense**: an explicit per-date window interval, with the qualifying
//!   rule on the exact interval intersection.
//!
//! Identifiers aggregate qualifying visits per location and return `None`
//! with a warning when nothing qualifies; downstream must tolerate the
//! absence of anchors.

mod bed_down;
mod work;

pub use bed_down::BedDownIdentifier;
pub use work::WorkIdentifier;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use pol_common::LocationVisit;

use crate::config::AnchorConfig;

/// Per-location aggregate over qualifying visits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorCandidate {
    pub location_id: u32,
    /// Location representative coordinate.
    pub lat: f64,
    pub lon: f64,
    /// Number of qualifying visits.
    pub count: usize,
    /// Sum of qualifying dwell, hours. Dense mode sums window intersections,
    /// sparse mode sums full stay durations.
    pub total_dwell_hours: f64,
    pub avg_dwell_hours: f64,
    /// Arrival of the earliest qualifying visit.
    pub first_dwell: DateTime<FixedOffset>,
    /// Arrival of the latest qualifying visit.
    pub last_dwell: DateTime<FixedOffset>,
    /// Dwell hours contributed by the latest qualifying visit.
    pub last_dwell_duration_hours: f64,
    /// Arrival date of each qualifying visit, in processing order.
    pub dwell_dates: Vec<NaiveDate>,
}

/// Insert-or-update accumulator keyed by location id.
#[derive(Debug, Default)]
pub(crate) struct CandidateBuilder {
    slots: BTreeMap<u32, AnchorCandidate>,
}

impl CandidateBuilder {
    /// Fold one qualifying visit into its location's aggregate.
    pub(crate) fn record(&mut self, visit: &LocationVisit, dwell_hours: f64) {
        let date = visit.arrived.date_naive();
        match self.slots.entry(visit.location_id) {
            Entry::Vacant(slot) => {
                slot.insert(AnchorCandidate {
                    location_id: visit.location_id,
                    lat: visit.centroid_lat,
                    lon: visit.centroid_lon,
                    count: 1,
                    total_dwell_hours: dwell_hours,
                    avg_dwell_hours: dwell_hours,
                    first_dwell: visit.arrived,
                    last_dwell: visit.arrived,
                    last_dwell_duration_hours: dwell_hours,
                    dwell_dates: vec![date],
                });
            }
            Entry::Occupied(mut slot) => {
                let candidate = slot.get_mut();
                candidate.count += 1;
                candidate.total_dwell_hours += dwell_hours;
                if visit.arrived < candidate.first_dwell {
                    candidate.first_dwell = visit.arrived;
                }
                if visit.arrived >= candidate.last_dwell {
                    candidate.last_dwell = visit.arrived;
                    candidate.last_dwell_duration_hours = dwell_hours;
                }
                candidate.dwell_dates.push(date);
            }
        }
    }

    /// Finalize averages; output is sorted by location id.
    pub(crate) fn finish(self) -> Vec<AnchorCandidate> {
        self.slots
            .into_values()
            .map(|mut candidate| {
                candidate.avg_dwell_hours = candidate.total_dwell_hours / candidate.count as f64;
                candidate
            })
            .collect()
    }
}

/// Dense-mode window intersection for one visit, in hours.
///
/// The window is anchored to the visit's arrival date; a wrapping window
/// (e.g. sleep 22 -> 5) is anchored to the day before when the arrival hour
/// is at or below the window end. Qualification requires the intersection
/// to exceed `min_duration_hours` strictly; `None` otherwise.
pub(crate) fn dense_overlap_hours(visit: &LocationVisit, config: &AnchorConfig) -> Option<f64> {
    let offset = *visit.arrived.offset();
    let date = visit.arrived.date_naive();

    let (start_date, end_date) = if config.wraps_midnight() {
        if visit.arrived.hour() <= config.window_end_hour {
            (date.pred_opt()?, date)
        } else {
            (date, date.succ_opt()?)
        }
    } else {
        (date, date)
    };
    let window_start = at_hour(start_date, config.window_start_hour, &offset)?;
    let window_end = at_hour(end_date, config.window_end_hour, &offset)?;

    let begin = visit.arrived.max(window_start);
    let end = visit.departed.min(window_end);
    let hours = (end - begin).num_milliseconds() as f64 / 3_600_000.0;
    (hours > config.min_duration_hours).then_some(hours)
}

/// A wall-clock instant on `date` at `hour`:00 in the given fixed offset.
fn at_hour(date: NaiveDate, hour: u32, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    offset.from_local_datetime(&naive).single()
}
