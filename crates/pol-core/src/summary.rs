//! Subject-level rollup of the profile table.
//!
//! One serializable record answering the dashboard questions: how many
//! places does this subject use, how concentrated is their time, how far do
//! their anchors spread, and how much can the routine be trusted.

use std::collections::BTreeMap;

use pol_common::SubjectId;
use pol_math::{center_of_mass, normalized_entropy, radius_of_gyration_m};
use serde::{Deserialize, Serialize};

use crate::profile::{LocationProfile, PatternLabel};

/// How much weight the routine index can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Moderate,
    Low,
}

impl ConfidenceTier {
    /// Tiers the routine index: above 0.66 is high, above 0.33 moderate,
    /// the rest low. Boundaries belong to the lower tier.
    pub fn from_routine_index(routine_index: f64) -> Self {
        if routine_index > 0.66 {
            ConfidenceTier::High
        } else if routine_index > 0.33 {
            ConfidenceTier::Moderate
        } else {
            ConfidenceTier::Low
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "high"),
            ConfidenceTier::Moderate => write!(f, "moderate"),
            ConfidenceTier::Low => write!(f, "low"),
        }
    }
}

/// Analytic rollup of one subject's profile table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSummary {
    pub subject_id: SubjectId,
    pub n_locations: usize,
    /// Visits summed over every location.
    pub n_visits: usize,
    pub total_dwell_hours: f64,
    /// Locations per behavioral label; every label is present, possibly 0.
    pub label_counts: BTreeMap<PatternLabel, usize>,
    pub n_candidate_homes: usize,
    pub n_candidate_works: usize,
    /// Dwell-weighted radius of gyration of location coordinates, meters.
    /// None when the table is empty.
    pub gyration_radius_m: Option<f64>,
    /// Dwell-weighted spherical center of mass, (lat, lon) degrees.
    pub center_of_mass: Option<(f64, f64)>,
    /// `1 - normalized_entropy(visit counts)`: 1.0 when one location absorbs
    /// every visit, 0.0 when visits spread evenly.
    pub routine_index: f64,
    pub confidence: ConfidenceTier,
}

impl PatternSummary {
    /// Rolls up a profile table. An empty table produces a schema-complete
    /// summary with zero counts and no geography.
    pub fn from_profiles(subject_id: SubjectId, profiles: &[LocationProfile]) -> Self {
        let mut label_counts: BTreeMap<PatternLabel, usize> =
            PatternLabel::ALL.iter().map(|&label| (label, 0)).collect();
        for profile in profiles {
            *label_counts.entry(profile.label).or_insert(0) += 1;
        }

        let lats: Vec<f64> = profiles.iter().map(|p| p.lat).collect();
        let lons: Vec<f64> = profiles.iter().map(|p| p.lon).collect();
        let dwell: Vec<f64> = profiles.iter().map(|p| p.total_dwell_hours).collect();
        let visits: Vec<f64> = profiles.iter().map(|p| p.visit_count as f64).collect();

        // One bin per location. Singleton tables score full entropy, so a
        // one-location subject reads as routine-free rather than perfectly
        // routine.
        let routine_index = 1.0 - normalized_entropy(&visits, Some(profiles.len()));

        PatternSummary {
            subject_id,
            n_locations: profiles.len(),
            n_visits: profiles.iter().map(|p| p.visit_count).sum(),
            total_dwell_hours: profiles.iter().map(|p| p.total_dwell_hours).sum(),
            label_counts,
            n_candidate_homes: profiles.iter().filter(|p| p.candidate_home).count(),
            n_candidate_works: profiles.iter().filter(|p| p.candidate_work).count(),
            gyration_radius_m: radius_of_gyration_m(&lats, &lons, Some(&dwell)),
            center_of_mass: center_of_mass(&lats, &lons, Some(&dwell)),
            routine_index,
            confidence: ConfidenceTier::from_routine_index(routine_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn profile(
        location_id: u32,
        lat: f64,
        lon: f64,
        total_dwell_hours: f64,
        visit_count: usize,
        label: PatternLabel,
        candidate_home: bool,
        candidate_work: bool,
    ) -> LocationProfile {
        LocationProfile {
            location_id,
            lat,
            lon,
            spatial_focus_m: 0.0,
            total_dwell_hours,
            first_seen: DateTime::parse_from_rfc3339("2025-03-03T08:00:00+00:00").unwrap(),
            last_seen: DateTime::parse_from_rfc3339("2025-03-10T08:00:00+00:00").unwrap(),
            visit_count,
            arrival_consistency: 0.5,
            dwell_consistency: 0.5,
            gap_consistency: 0.5,
            recency: 1.0,
            depth: 0.5,
            visit_saturation: 0.5,
            loyalty_index: 0.6,
            predictability_index: 0.5,
            label,
            candidate_home,
            candidate_work,
        }
    }

    #[test]
    fn counts_roll_up_across_locations() {
        let table = vec![
            profile(0, 52.0, 4.0, 80.0, 10, PatternLabel::Anchor, true, false),
            profile(1, 52.1, 4.1, 40.0, 8, PatternLabel::Habit, false, true),
            profile(2, 52.2, 4.2, 1.0, 1, PatternLabel::Transient, false, false),
        ];
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &table);

        assert_eq!(summary.n_locations, 3);
        assert_eq!(summary.n_visits, 19);
        assert!((summary.total_dwell_hours - 121.0).abs() < 1e-12);
        assert_eq!(summary.n_candidate_homes, 1);
        assert_eq!(summary.n_candidate_works, 1);
        assert_eq!(summary.label_counts[&PatternLabel::Anchor], 1);
        assert_eq!(summary.label_counts[&PatternLabel::Habit], 1);
        assert_eq!(summary.label_counts[&PatternLabel::Transient], 1);
        // Unused labels are still present for a stable schema.
        assert_eq!(summary.label_counts[&PatternLabel::Recurring], 0);
    }

    #[test]
    fn even_visit_spread_scores_no_routine() {
        let table = vec![
            profile(0, 52.0, 4.0, 10.0, 5, PatternLabel::Habit, false, false),
            profile(1, 52.1, 4.1, 10.0, 5, PatternLabel::Habit, false, false),
        ];
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &table);
        assert!(summary.routine_index.abs() < 1e-12);
        assert_eq!(summary.confidence, ConfidenceTier::Low);
    }

    #[test]
    fn dominant_location_scores_high_routine() {
        let table = vec![
            profile(0, 52.0, 4.0, 500.0, 99, PatternLabel::Anchor, true, false),
            profile(1, 52.1, 4.1, 1.0, 1, PatternLabel::Transient, false, false),
        ];
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &table);
        assert!(summary.routine_index > 0.9);
        assert_eq!(summary.confidence, ConfidenceTier::High);
    }

    #[test]
    fn geography_is_dwell_weighted() {
        // Two equatorial points a degree of longitude apart, 3:1 dwell.
        let table = vec![
            profile(0, 0.0, 0.0, 3.0, 5, PatternLabel::Anchor, true, false),
            profile(1, 0.0, 1.0, 1.0, 5, PatternLabel::Habit, false, false),
        ];
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &table);

        let (lat, lon) = summary.center_of_mass.unwrap();
        assert!(lat.abs() < 1e-9);
        assert!((lon - 0.25).abs() < 1e-4);

        // Weighted rms distance from the 3:1 mean is sqrt(3) quarter-degrees.
        let rg = summary.gyration_radius_m.unwrap();
        assert!((rg - 48_149.0).abs() < 5.0, "rg = {rg}");
    }

    #[test]
    fn empty_table_is_schema_complete() {
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &[]);
        assert_eq!(summary.n_locations, 0);
        assert_eq!(summary.n_visits, 0);
        assert_eq!(summary.label_counts.len(), 4);
        assert!(summary.gyration_radius_m.is_none());
        assert!(summary.center_of_mass.is_none());
        assert!(summary.routine_index.abs() < 1e-12);
        assert_eq!(summary.confidence, ConfidenceTier::Low);
    }

    #[test]
    fn single_location_reads_as_routine_free() {
        let table = vec![profile(0, 52.0, 4.0, 80.0, 10, PatternLabel::Anchor, true, false)];
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &table);
        assert!(summary.routine_index.abs() < 1e-12);
        assert_eq!(summary.confidence, ConfidenceTier::Low);
    }

    #[test]
    fn tier_boundaries_belong_to_the_lower_tier() {
        assert_eq!(ConfidenceTier::from_routine_index(0.67), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_routine_index(0.66), ConfidenceTier::Moderate);
        assert_eq!(ConfidenceTier::from_routine_index(0.34), ConfidenceTier::Moderate);
        assert_eq!(ConfidenceTier::from_routine_index(0.33), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::from_routine_index(0.0), ConfidenceTier::Low);
    }

    #[test]
    fn summary_serializes_for_the_dashboard() {
        let table = vec![profile(0, 52.0, 4.0, 80.0, 10, PatternLabel::Anchor, true, false)];
        let summary = PatternSummary::from_profiles(SubjectId::from("s-1"), &table);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"subject_id\":\"s-1\""));
        assert!(json.contains("\"confidence\":\"low\""));
        assert!(json.contains("\"Anchor\":1"));
    }
}
