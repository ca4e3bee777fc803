//! Stay-point detection over ordered position fixes.
//!
//! Segments one subject's fix sequence into stay points: contiguous windows
//! where the subject lingered. A candidate window grows while
//! - every fix stays within `distance_thresh_m` of the window's first fix, and
//! - adjacent fixes arrive within `gap_thresh_minutes` of each other.
//!
//! When either rule breaks (or the sequence ends), the window is emitted as a
//! stay point iff its elapsed time reaches `time_thresh_minutes`; otherwise it
//! is discarded. The next window starts at the breaking fix, so emitted stay
//! points never overlap in time.

use pol_common::{PositionFix, Result, StayPoint};
use pol_math::haversine_distance_m;

use crate::config::DetectorConfig;

/// Windowed spatio-temporal stay-point detector.
#[derive(Debug, Clone)]
pub struct StayPointDetector {
    config: DetectorConfig,
}

impl StayPointDetector {
    /// Create a detector, validating the configuration up front.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(StayPointDetector { config })
    }

    /// Segment `fixes` into stay points.
    ///
    /// Fixes must be ordered by timestamp and belong to one subject. An empty
    /// result is not an error: it is returned schema-complete with a warning,
    /// and the caller decides whether to halt.
    pub fn detect(&self, fixes: &[PositionFix]) -> Vec<StayPoint> {
        tracing::debug!(n_fixes = fixes.len(), "stay-point detection started");

        let mut stay_points = Vec::new();
        let mut i = 0;
        while i < fixes.len() {
            // Grow the window until a gap or distance break.
            let mut j = i + 1;
            while j < fixes.len() {
                let gap_minutes = minutes_between(&fixes[j - 1], &fixes[j]);
                if gap_minutes > self.config.gap_thresh_minutes {
                    break;
                }
                let spread_m = haversine_distance_m(
                    fixes[i].lat,
                    fixes[i].lon,
                    fixes[j].lat,
                    fixes[j].lon,
                );
                if spread_m > self.config.distance_thresh_m {
                    break;
                }
                j += 1;
            }

            if let Some(stay) = self.evaluate_window(&fixes[i..j]) {
                tracing::trace!(
                    arrived = %stay.arrived,
                    duration_minutes = stay.duration_minutes,
                    n_points = stay.n_points,
                    "stay point emitted"
                );
                stay_points.push(stay);
            }
            i = j;
        }

        if stay_points.is_empty() {
            tracing::warn!(
                n_fixes = fixes.len(),
                distance_thresh_m = self.config.distance_thresh_m,
                time_thresh_minutes = self.config.time_thresh_minutes,
                "no stay points detected; consider relaxing thresholds"
            );
        } else {
            tracing::debug!(n_stay_points = stay_points.len(), "stay-point detection finished");
        }
        stay_points
    }

    /// Emit a window as a stay point when its elapsed time qualifies.
    ///
    /// `departed` is the last fix inside the window, never the breaking fix,
    /// so `duration = departed - arrived` exactly.
    fn evaluate_window(&self, window: &[PositionFix]) -> Option<StayPoint> {
        let first = window.first()?;
        let last = window.last()?;
        let elapsed_minutes = minutes_between(first, last);
        if elapsed_minutes < self.config.time_thresh_minutes {
            return None;
        }

        let n = window.len() as f64;
        let lat = window.iter().map(|f| f.lat).sum::<f64>() / n;
        let lon = window.iter().map(|f| f.lon).sum::<f64>() / n;

        Some(StayPoint {
            subject_id: first.subject_id.clone(),
            arrived: first.timestamp,
            departed: last.timestamp,
            lat,
            lon,
            duration_minutes: elapsed_minutes,
            n_points: window.len(),
        })
    }
}

fn minutes_between(earlier: &PositionFix, later: &PositionFix) -> f64 {
    (later.timestamp - earlier.timestamp).num_milliseconds() as f64 / 60_000.0
}
