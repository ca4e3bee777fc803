//! Duty-location (candidate work) identification.
//!
//! A location is a work candidate when the subject's weekday stays overlap
//! the configured duty window (default 08:00 -> 18:00). Work windows never
//! wrap midnight; overnight shifts are outside this rule set.

use chrono::{Datelike, Timelike, Weekday};

use pol_common::{CoverageMode, Error, LocationVisit, Result};

use crate::config::AnchorConfig;

use super::{dense_overlap_hours, AnchorCandidate, CandidateBuilder};

const ALL_DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Duty-window anchor identifier.
#[derive(Debug, Clone)]
pub struct WorkIdentifier {
    config: AnchorConfig,
}

impl WorkIdentifier {
    /// Create an identifier, validating the configuration up front.
    /// Wrapping windows are rejected here.
    pub fn new(config: AnchorConfig) -> Result<Self> {
        config.validate()?;
        if config.wraps_midnight() {
            return Err(Error::InvalidValue {
                field: "window_end_hour",
                message: format!(
                    "work windows must not wrap past midnight, got {} -> {}",
                    config.window_start_hour, config.window_end_hour
                ),
            });
        }
        Ok(WorkIdentifier { config })
    }

    /// Aggregate qualifying visits per location.
    ///
    /// `exclude_home` drops locations already classified as candidate home.
    /// Returns `None` with a warning when no visit qualifies.
    pub fn identify(
        &self,
        visits: &[LocationVisit],
        exclude_home: &[u32],
    ) -> Option<Vec<AnchorCandidate>> {
        let days = self.config.work_days.as_deref().unwrap_or(&ALL_DAYS);

        let mut builder = CandidateBuilder::default();
        for visit in visits {
            if exclude_home.contains(&visit.location_id) {
                continue;
            }
            if !days.contains(&visit.arrived.weekday()) {
                continue;
            }
            if let Some(dwell_hours) = self.qualify(visit) {
                builder.record(visit, dwell_hours);
            }
        }

        let candidates = builder.finish();
        if candidates.is_empty() {
            tracing::warn!(
                n_visits = visits.len(),
                coverage = %self.config.coverage,
                "no work candidates qualified"
            );
            return None;
        }
        tracing::debug!(n_candidates = candidates.len(), "work identification finished");
        Some(candidates)
    }

    fn qualify(&self, visit: &LocationVisit) -> Option<f64> {
        match self.config.coverage {
            CoverageMode::Sparse => self.qualify_sparse(visit),
            CoverageMode::Dense => dense_overlap_hours(visit, &self.config),
        }
    }

    /// Permissive rule: arrival hour in [start, end) or departure hour in
    /// (start, end], with the minimum duration, all on one calendar day.
    fn qualify_sparse(&self, visit: &LocationVisit) -> Option<f64> {
        let duration_hours = visit.duration_hours();
        if duration_hours < self.config.min_duration_hours {
            return None;
        }
        if visit.arrived.date_naive() != visit.departed.date_naive() {
            return None;
        }

        let start = self.config.window_start_hour;
        let end = self.config.window_end_hour;
        let arrives_in = visit.arrived.hour() >= start && visit.arrived.hour() < end;
        let departs_in = visit.departed.hour() > start && visit.departed.hour() <= end;

        (arrives_in || departs_in).then_some(duration_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::visit;
    use super::*;

    fn sparse() -> WorkIdentifier {
        WorkIdentifier::new(AnchorConfig::work()).unwrap()
    }

    fn dense() -> WorkIdentifier {
        let mut config = AnchorConfig::work();
        config.coverage = CoverageMode::Dense;
        WorkIdentifier::new(config).unwrap()
    }

    // ==================== sparse rules ====================

    #[test]
    fn weekday_office_hours_qualify() {
        // Monday 09:00 -> 17:00.
        let visits = [visit(1, "2025-03-03T09:00:00+02:00", 8.0)];
        let candidates = sparse().identify(&visits, &[]).unwrap();
        assert_eq!(candidates[0].location_id, 1);
        assert!((candidates[0].total_dwell_hours - 8.0).abs() < 1e-9);
    }

    #[test]
    fn weekend_stays_are_filtered_out() {
        // Saturday 09:00 -> 17:00.
        let visits = [visit(1, "2025-03-08T09:00:00+02:00", 8.0)];
        assert!(sparse().identify(&visits, &[]).is_none());
    }

    #[test]
    fn early_arrival_qualifies_through_departure_hour() {
        // Monday 06:00 -> 12:00: arrival misses [8, 18) but the departure
        // lands in (8, 18].
        let visits = [visit(1, "2025-03-03T06:00:00+02:00", 6.0)];
        assert!(sparse().identify(&visits, &[]).is_some());
    }

    #[test]
    fn evening_stay_does_not_qualify() {
        // Monday 19:00 -> 23:30.
        let visits = [visit(1, "2025-03-03T19:00:00+02:00", 4.5)];
        assert!(sparse().identify(&visits, &[]).is_none());
    }

    #[test]
    fn overnight_shift_fails_the_same_day_rule() {
        // Monday 16:00 -> Tuesday 02:00: in-window arrival, 10 h, but the
        // stay crosses midnight.
        let visits = [visit(1, "2025-03-03T16:00:00+02:00", 10.0)];
        assert!(sparse().identify(&visits, &[]).is_none());
    }

    #[test]
    fn short_errand_does_not_qualify() {
        // Monday 10:00 -> 11:00, under the 4 h minimum.
        let visits = [visit(1, "2025-03-03T10:00:00+02:00", 1.0)];
        assert!(sparse().identify(&visits, &[]).is_none());
    }

    #[test]
    fn window_boundaries_are_half_open() {
        // Arrival exactly at the end hour misses [start, end).
        let at_end = [visit(1, "2025-03-03T18:00:00+02:00", 4.0)];
        assert!(sparse().identify(&at_end, &[]).is_none());

        // Departure exactly at the start hour misses (start, end].
        let to_start = [visit(1, "2025-03-03T04:00:00+02:00", 4.0)];
        assert!(sparse().identify(&to_start, &[]).is_none());

        // Departure exactly at the end hour qualifies.
        let to_end = [visit(1, "2025-03-03T07:00:00+02:00", 11.0)];
        assert!(sparse().identify(&to_end, &[]).is_some());
    }

    // ==================== exclusion ====================

    #[test]
    fn home_locations_are_excluded() {
        let visits = [
            visit(0, "2025-03-03T09:00:00+02:00", 8.0),
            visit(1, "2025-03-04T09:00:00+02:00", 8.0),
        ];
        let candidates = sparse().identify(&visits, &[0]).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].location_id, 1);
    }

    #[test]
    fn excluding_every_location_returns_none() {
        let visits = [visit(0, "2025-03-03T09:00:00+02:00", 8.0)];
        assert!(sparse().identify(&visits, &[0]).is_none());
    }

    // ==================== dense rules ====================

    #[test]
    fn dense_mode_counts_only_window_overlap() {
        // Monday 07:00 -> 12:30 overlaps [08:00, 18:00] for 4.5 hours.
        let visits = [visit(1, "2025-03-03T07:00:00+02:00", 5.5)];
        let candidates = dense().identify(&visits, &[]).unwrap();
        assert!((candidates[0].total_dwell_hours - 4.5).abs() < 1e-9);
    }

    #[test]
    fn dense_mode_rejects_exact_minimum() {
        // Monday 07:00 -> 12:00: exactly 4 h of overlap.
        let visits = [visit(1, "2025-03-03T07:00:00+02:00", 5.0)];
        assert!(dense().identify(&visits, &[]).is_none());
    }

    #[test]
    fn dense_mode_still_filters_weekends() {
        // Saturday 09:00 -> 17:00 would overlap 8 h.
        let visits = [visit(1, "2025-03-08T09:00:00+02:00", 8.0)];
        assert!(dense().identify(&visits, &[]).is_none());
    }

    // ==================== construction ====================

    #[test]
    fn wrapping_window_is_rejected() {
        let mut config = AnchorConfig::work();
        config.window_start_hour = 20;
        config.window_end_hour = 4;
        assert!(WorkIdentifier::new(config).is_err());
    }

    #[test]
    fn no_weekday_set_accepts_every_day() {
        let mut config = AnchorConfig::work();
        config.work_days = None;
        let identifier = WorkIdentifier::new(config).unwrap();

        let visits = [visit(1, "2025-03-08T09:00:00+02:00", 8.0)];
        assert!(identifier.identify(&visits, &[]).is_some());
    }
}
