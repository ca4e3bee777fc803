//! Per-location behavioral profiling and classification.
//!
//! The profiler is the authoritative scorer. For every location it computes
//! spatial focus, dwell/visit totals, the three consistency metrics, the
//! half-life recency/depth/saturation scores, the Loyalty and Predictability
//! indices, a pattern label, and candidate home/work flags from the anchor
//! identifiers. The profile table is recomputed wholesale on every run; rows
//! are sorted ascending by location id.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};

use pol_common::{Error, LocationVisit, PipelineStage, Result};
use pol_math::{
    exponential_decay, exponential_saturation, harmonic_mean, normalized_consistency,
    radius_of_gyration_m,
};

use crate::anchor::{BedDownIdentifier, WorkIdentifier};
use crate::config::ProfilerConfig;

/// Days since last visit at which recency decays to 0.5.
const RECENCY_HALF_LIFE_DAYS: f64 = 30.0;
/// Cumulative dwell hours at which depth saturates to 0.5.
const DEPTH_HALF_LIFE_HOURS: f64 = 4.0;
/// Visit count at which visit saturation reaches 0.5.
const VISIT_HALF_LIFE: f64 = 10.0;
/// Below this many visits the inter-visit gap distribution is degenerate.
const MIN_VISITS_FOR_GAPS: usize = 5;

/// Behavioral classification of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternLabel {
    Transient,
    Recurring,
    Habit,
    Anchor,
}

impl PatternLabel {
    /// Every label, ordered from least to most routine.
    pub const ALL: [PatternLabel; 4] = [
        PatternLabel::Transient,
        PatternLabel::Recurring,
        PatternLabel::Habit,
        PatternLabel::Anchor,
    ];

    /// Threshold the composite loyalty index. Boundary values belong to the
    /// higher tier.
    pub fn classify(index: f64) -> Self {
        if index >= 0.50 {
            PatternLabel::Anchor
        } else if index >= 0.25 {
            PatternLabel::Habit
        } else if index >= 0.05 {
            PatternLabel::Recurring
        } else {
            PatternLabel::Transient
        }
    }
}

impl std::fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternLabel::Transient => write!(f, "Transient"),
            PatternLabel::Recurring => write!(f, "Recurring"),
            PatternLabel::Habit => write!(f, "Habit"),
            PatternLabel::Anchor => write!(f, "Anchor"),
        }
    }
}

/// One profiled location. Field order is the serialized column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationProfile {
    pub location_id: u32,
    /// Location representative coordinate.
    pub lat: f64,
    pub lon: f64,
    /// Radius of gyration of member stay positions, meters.
    pub spatial_focus_m: f64,
    pub total_dwell_hours: f64,
    /// Earliest member arrival.
    pub first_seen: DateTime<FixedOffset>,
    /// Latest member arrival.
    pub last_seen: DateTime<FixedOffset>,
    pub visit_count: usize,
    pub arrival_consistency: f64,
    pub dwell_consistency: f64,
    pub gap_consistency: f64,
    /// Decay over days since the last visit.
    pub recency: f64,
    /// Saturation over cumulative dwell hours.
    pub depth: f64,
    /// Saturation over visit count.
    pub visit_saturation: f64,
    /// Harmonic mean of recency, depth, and visit saturation.
    pub loyalty_index: f64,
    /// Arithmetic mean of the three consistency metrics.
    pub predictability_index: f64,
    pub label: PatternLabel,
    pub candidate_home: bool,
    pub candidate_work: bool,
}

/// Per-location behavioral profiler with a cached profile table.
#[derive(Debug)]
pub struct LocationProfiler {
    sleep: BedDownIdentifier,
    work: WorkIdentifier,
    profiles: Option<Vec<LocationProfile>>,
}

impl LocationProfiler {
    /// Create a profiler, validating the configuration up front.
    pub fn new(config: ProfilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(LocationProfiler {
            sleep: BedDownIdentifier::new(config.sleep)?,
            work: WorkIdentifier::new(config.work)?,
            profiles: None,
        })
    }

    /// Score and classify every location in the visit table, replacing any
    /// previously cached profile.
    pub fn profile(&mut self, visits: &[LocationVisit]) -> Result<&[LocationProfile]> {
        if visits.is_empty() {
            return Err(Error::InsufficientData {
                stage: PipelineStage::Profiling,
                needed: 1,
                got: 0,
            });
        }

        let home_ids: Vec<u32> = self
            .sleep
            .identify(visits)
            .map(|c| c.iter().map(|a| a.location_id).collect())
            .unwrap_or_default();
        // The identifier's home-exclusion parameter stays available to direct
        // callers; the profiler reports raw work overlap per location.
        let work_ids: Vec<u32> = self
            .work
            .identify(visits, &[])
            .map(|c| c.iter().map(|a| a.location_id).collect())
            .unwrap_or_default();

        let global_last = visits
            .iter()
            .map(|v| v.arrived)
            .max()
            .ok_or(Error::InsufficientData {
                stage: PipelineStage::Profiling,
                needed: 1,
                got: 0,
            })?;

        let mut members: BTreeMap<u32, Vec<&LocationVisit>> = BTreeMap::new();
        for visit in visits {
            members.entry(visit.location_id).or_default().push(visit);
        }

        let rows: Vec<LocationProfile> = members
            .iter()
            .map(|(&id, group)| profile_location(id, group, global_last, &home_ids, &work_ids))
            .collect();
        tracing::debug!(
            n_visits = visits.len(),
            n_locations = rows.len(),
            n_candidate_home = home_ids.len(),
            n_candidate_work = work_ids.len(),
            "profiling finished"
        );

        self.profiles = Some(rows);
        self.profiles()
    }

    /// The cached profile table. Fails until `profile` has run.
    pub fn profiles(&self) -> Result<&[LocationProfile]> {
        self.profiles.as_deref().ok_or(Error::NotFitted("profile"))
    }

    /// The most likely home location id.
    ///
    /// Picks the maximum-loyalty candidate-home location; with no candidates
    /// it deliberately falls back to the global maximum across all profiled
    /// locations. Fails until `profile` has run.
    pub fn get_likely_home(&self) -> Result<u32> {
        let profiles = self.profiles()?;
        let best = if profiles.iter().any(|p| p.candidate_home) {
            max_by_loyalty(profiles.iter().filter(|p| p.candidate_home))
        } else {
            tracing::info!("no candidate-home locations; falling back to global maximum loyalty");
            max_by_loyalty(profiles.iter())
        };
        best.map(|p| p.location_id).ok_or(Error::InsufficientData {
            stage: PipelineStage::Profiling,
            needed: 1,
            got: 0,
        })
    }
}

/// First row attaining the maximum loyalty index.
fn max_by_loyalty<'a>(
    rows: impl Iterator<Item = &'a LocationProfile>,
) -> Option<&'a LocationProfile> {
    rows.fold(None, |best, row| match best {
        Some(b) if b.loyalty_index >= row.loyalty_index => Some(b),
        _ => Some(row),
    })
}

fn profile_location(
    id: u32,
    members: &[&LocationVisit],
    global_last: DateTime<FixedOffset>,
    home_ids: &[u32],
    work_ids: &[u32],
) -> LocationProfile {
    let lats: Vec<f64> = members.iter().map(|v| v.lat).collect();
    let lons: Vec<f64> = members.iter().map(|v| v.lon).collect();
    let spatial_focus_m = radius_of_gyration_m(&lats, &lons, None).unwrap_or(0.0);

    let total_dwell_hours = members.iter().map(|v| v.duration_minutes).sum::<f64>() / 60.0;

    let mut arrivals: Vec<DateTime<FixedOffset>> = members.iter().map(|v| v.arrived).collect();
    arrivals.sort();
    // Groups are non-empty by construction.
    let first_seen = arrivals[0];
    let last_seen = arrivals[arrivals.len() - 1];

    let arrival_hours: Vec<f64> = arrivals.iter().map(|a| a.hour() as f64).collect();
    let durations: Vec<f64> = members.iter().map(|v| v.duration_minutes).collect();
    let gaps: Vec<f64> = if members.len() < MIN_VISITS_FOR_GAPS {
        vec![0.0]
    } else {
        arrivals
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days() as f64)
            .collect()
    };

    let arrival_consistency = normalized_consistency(&arrival_hours);
    let dwell_consistency = normalized_consistency(&durations);
    let gap_consistency = normalized_consistency(&gaps);

    let days_since_last = (global_last - last_seen).num_days() as f64;
    let recency = exponential_decay(days_since_last, RECENCY_HALF_LIFE_DAYS);
    let depth = exponential_saturation(total_dwell_hours, DEPTH_HALF_LIFE_HOURS);
    let visit_saturation = exponential_saturation(members.len() as f64, VISIT_HALF_LIFE);

    let loyalty_index = harmonic_mean(&[recency, depth, visit_saturation]);
    let predictability_index = (arrival_consistency + dwell_consistency + gap_consistency) / 3.0;

    LocationProfile {
        location_id: id,
        lat: members[0].centroid_lat,
        lon: members[0].centroid_lon,
        spatial_focus_m,
        total_dwell_hours,
        first_seen,
        last_seen,
        visit_count: members.len(),
        arrival_consistency,
        dwell_consistency,
        gap_consistency,
        recency,
        depth,
        visit_saturation,
        loyalty_index,
        predictability_index,
        label: PatternLabel::classify(loyalty_index),
        candidate_home: home_ids.contains(&id),
        candidate_work: work_ids.contains(&id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pol_common::SubjectId;

    fn visit_at(
        location_id: u32,
        lat: f64,
        lon: f64,
        arrived: &str,
        duration_hours: f64,
    ) -> LocationVisit {
        let arrived = DateTime::parse_from_rfc3339(arrived).unwrap();
        LocationVisit {
            subject_id: SubjectId::from("subject-1"),
            location_id,
            centroid_lat: lat,
            centroid_lon: lon,
            arrived,
            lat,
            lon,
            departed: arrived + Duration::minutes((duration_hours * 60.0) as i64),
            duration_minutes: duration_hours * 60.0,
            n_points: 4,
        }
    }

    fn visit(location_id: u32, arrived: &str, duration_hours: f64) -> LocationVisit {
        let lat = 52.0 + location_id as f64 * 0.05;
        visit_at(location_id, lat, 4.0, arrived, duration_hours)
    }

    /// Ten nights at location 0, two lunches at location 1.
    fn home_and_cafe() -> Vec<LocationVisit> {
        let mut visits = Vec::new();
        for day in 3..13 {
            let arrived = format!("2025-03-{:02}T23:00:00+02:00", day);
            visits.push(visit(0, &arrived, 8.0));
        }
        visits.push(visit(1, "2025-03-05T12:00:00+02:00", 1.0));
        visits.push(visit(1, "2025-03-10T12:00:00+02:00", 1.0));
        visits
    }

    fn profiler() -> LocationProfiler {
        LocationProfiler::new(ProfilerConfig::default()).unwrap()
    }

    // ==================== classification ====================

    #[test]
    fn classify_boundaries_are_inclusive() {
        assert_eq!(PatternLabel::classify(0.50), PatternLabel::Anchor);
        assert_eq!(PatternLabel::classify(0.25), PatternLabel::Habit);
        assert_eq!(PatternLabel::classify(0.05), PatternLabel::Recurring);
        assert_eq!(PatternLabel::classify(0.049), PatternLabel::Transient);
        assert_eq!(PatternLabel::classify(0.9), PatternLabel::Anchor);
        assert_eq!(PatternLabel::classify(0.0), PatternLabel::Transient);
    }

    // ==================== scoring ====================

    #[test]
    fn nightly_home_profiles_as_anchor() {
        let visits = home_and_cafe();
        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();

        let home = &profiles[0];
        assert_eq!(home.location_id, 0);
        assert_eq!(home.visit_count, 10);
        assert!((home.total_dwell_hours - 80.0).abs() < 1e-9);
        // Last visit is the subject's most recent arrival anywhere.
        assert!((home.recency - 1.0).abs() < 1e-12);
        // Ten visits with a 10-visit half-life.
        assert!((home.visit_saturation - 0.5).abs() < 1e-12);
        assert!(home.loyalty_index >= 0.50);
        assert_eq!(home.label, PatternLabel::Anchor);
        assert!(home.candidate_home);
        assert!(!home.candidate_work);
    }

    #[test]
    fn perfectly_regular_visits_score_full_predictability() {
        let visits = home_and_cafe();
        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();

        let home = &profiles[0];
        assert!((home.arrival_consistency - 1.0).abs() < 1e-12);
        assert!((home.dwell_consistency - 1.0).abs() < 1e-12);
        assert!((home.gap_consistency - 1.0).abs() < 1e-12);
        assert!((home.predictability_index - 1.0).abs() < 1e-12);
    }

    #[test]
    fn occasional_cafe_profiles_as_recurring() {
        let visits = home_and_cafe();
        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();

        let cafe = &profiles[1];
        assert_eq!(cafe.location_id, 1);
        assert_eq!(cafe.visit_count, 2);
        assert_eq!(cafe.label, PatternLabel::Recurring);
        assert!(cafe.loyalty_index < profiles[0].loyalty_index);
        assert!(!cafe.candidate_home);
        // Two visits sit below the gap-distribution minimum.
        assert_eq!(cafe.gap_consistency, 0.0);
    }

    #[test]
    fn spatial_focus_reflects_member_spread() {
        let visits = vec![
            visit_at(0, 52.0, 4.0, "2025-03-03T10:00:00+02:00", 2.0),
            visit_at(0, 52.0, 4.0, "2025-03-04T10:00:00+02:00", 2.0),
            visit_at(1, 48.0, 2.0, "2025-03-05T10:00:00+02:00", 2.0),
            visit_at(1, 48.001, 2.0, "2025-03-06T10:00:00+02:00", 2.0),
        ];
        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();

        assert_eq!(profiles[0].spatial_focus_m, 0.0);
        assert!(profiles[1].spatial_focus_m > 10.0);
    }

    #[test]
    fn first_and_last_seen_are_arrival_extremes() {
        let visits = home_and_cafe();
        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();

        let home = &profiles[0];
        assert_eq!(home.first_seen.date_naive().to_string(), "2025-03-03");
        assert_eq!(home.last_seen.date_naive().to_string(), "2025-03-12");
    }

    #[test]
    fn rows_are_sorted_by_location_id() {
        let visits = vec![
            visit(3, "2025-03-03T10:00:00+02:00", 2.0),
            visit(1, "2025-03-04T10:00:00+02:00", 2.0),
            visit(3, "2025-03-05T10:00:00+02:00", 2.0),
        ];
        let mut profiler = profiler();
        let ids: Vec<u32> = profiler
            .profile(&visits)
            .unwrap()
            .iter()
            .map(|p| p.location_id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    // ==================== likely home ====================

    #[test]
    fn likely_home_prefers_candidate_home_locations() {
        let visits = home_and_cafe();
        let mut profiler = profiler();
        profiler.profile(&visits).unwrap();
        assert_eq!(profiler.get_likely_home().unwrap(), 0);
    }

    #[test]
    fn likely_home_falls_back_to_global_maximum_loyalty() {
        // Midday-only history: nothing overlaps the sleep window.
        let mut visits: Vec<LocationVisit> = (3..9)
            .map(|day| visit(0, &format!("2025-03-{:02}T10:00:00+02:00", day), 2.0))
            .collect();
        visits.push(visit(1, "2025-03-04T14:00:00+02:00", 1.0));

        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();
        assert!(profiles.iter().all(|p| !p.candidate_home));
        assert_eq!(profiler.get_likely_home().unwrap(), 0);
    }

    // ==================== lifecycle ====================

    #[test]
    fn accessors_fail_before_profiling() {
        let profiler = profiler();
        assert!(matches!(profiler.profiles(), Err(Error::NotFitted(_))));
        assert!(matches!(profiler.get_likely_home(), Err(Error::NotFitted(_))));
    }

    #[test]
    fn empty_visit_table_is_insufficient() {
        let mut profiler = profiler();
        match profiler.profile(&[]) {
            Err(Error::InsufficientData { stage, .. }) => {
                assert_eq!(stage, PipelineStage::Profiling)
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn reprofiling_replaces_the_cached_table() {
        let mut profiler = profiler();
        profiler.profile(&home_and_cafe()).unwrap();
        assert_eq!(profiler.profiles().unwrap().len(), 2);

        let solo = vec![
            visit(7, "2025-04-01T23:00:00+02:00", 8.0),
            visit(7, "2025-04-02T23:00:00+02:00", 8.0),
        ];
        profiler.profile(&solo).unwrap();
        let profiles = profiler.profiles().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].location_id, 7);
    }

    // ==================== serialization ====================

    #[test]
    fn profile_serializes_with_id_first() {
        let visits = home_and_cafe();
        let mut profiler = profiler();
        let profiles = profiler.profile(&visits).unwrap();
        let json = serde_json::to_string(&profiles[0]).unwrap();
        assert!(json.starts_with("{\"location_id\":"));
        assert!(json.contains("\"label\":\"Anchor\""));
        assert!(json.contains("\"candidate_home\":true"));
    }
}
