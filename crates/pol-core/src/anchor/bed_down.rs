//! Bed-down (candidate home) identification.
//!
//! A location is a bed-down candidate when the subject's stays overlap the
//! configured sleep window (default 22:00 -> 05:00, wrapping midnight).

use chrono::Timelike;

use pol_common::{CoverageMode, LocationVisit, Result};

use crate::config::AnchorConfig;

use super::{dense_overlap_hours, AnchorCandidate, CandidateBuilder};

/// Sleep-window anchor identifier.
///
/// Any weekday restriction on the config is ignored: people sleep on
/// weekends too.
#[derive(Debug, Clone)]
pub struct BedDownIdentifier {
    config: AnchorConfig,
}

impl BedDownIdentifier {
    /// Create an identifier, validating the configuration up front.
    pub fn new(config: AnchorConfig) -> Result<Self> {
        config.validate()?;
        Ok(BedDownIdentifier { config })
    }

    /// Aggregate qualifying visits per location.
    ///
    /// Returns `None` with a warning when no visit qualifies.
    pub fn identify(&self, visits: &[LocationVisit]) -> Option<Vec<AnchorCandidate>> {
        let mut builder = CandidateBuilder::default();
        for visit in visits {
            if let Some(dwell_hours) = self.qualify(visit) {
                builder.record(visit, dwell_hours);
            }
        }

        let candidates = builder.finish();
        if candidates.is_empty() {
            tracing::warn!(
                n_visits = visits.len(),
                coverage = %self.config.coverage,
                "no bed-down candidates qualified"
            );
            return None;
        }
        tracing::debug!(n_candidates = candidates.len(), "bed-down identification finished");
        Some(candidates)
    }

    /// Dwell hours this visit contributes, or `None` if it does not qualify.
    fn qualify(&self, visit: &LocationVisit) -> Option<f64> {
        match self.config.coverage {
            CoverageMode::Sparse => self.qualify_sparse(visit),
            CoverageMode::Dense => dense_overlap_hours(visit, &self.config),
        }
    }

    /// Permissive rule: qualify when the stay spans a date boundary
    /// overnight, or arrives at/after the window opens, or departs at/before
    /// it closes; the hour rules also require the minimum duration.
    fn qualify_sparse(&self, visit: &LocationVisit) -> Option<f64> {
        let duration_hours = visit.duration_hours();
        let long_enough = duration_hours >= self.config.min_duration_hours;

        let overnight = visit.arrived.date_naive() != visit.departed.date_naive();
        let arrives_in = visit.arrived.hour() >= self.config.window_start_hour && long_enough;
        let departs_in = visit.departed.hour() <= self.config.window_end_hour && long_enough;

        (overnight || arrives_in || departs_in).then_some(duration_hours)
    }
}
