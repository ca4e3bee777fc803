//! Configuration types for the taxonomy pipeline.
//!
//! This module handles:
//! - Typed per-stage parameter structs with canonical defaults
//! - Semantic validation (positive thresholds, odd simulation counts)
//! - Serde derives so a run's configuration can be snapshotted into logs
//!
//! Validation runs before any computation; a failed `validate()` carries the
//! offending field name.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use pol_common::{CoverageMode, Error, Result};

/// Stay-point detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Maximum great-circle spread of a candidate window, meters.
    pub distance_thresh_m: f64,
    /// Minimum elapsed time for a window to qualify as a stay, minutes.
    pub time_thresh_minutes: f64,
    /// Maximum gap between adjacent fixes inside one window, minutes.
    pub gap_thresh_minutes: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            distance_thresh_m: 100.0,
            time_thresh_minutes: 30.0,
            gap_thresh_minutes: 60.0,
        }
    }
}

impl DetectorConfig {
    /// Validate detection parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.distance_thresh_m.is_finite() || self.distance_thresh_m <= 0.0 {
            return Err(Error::InvalidValue {
                field: "distance_thresh_m",
                message: format!("must be a positive number of meters, got {}", self.distance_thresh_m),
            });
        }
        if !self.time_thresh_minutes.is_finite() || self.time_thresh_minutes <= 0.0 {
            return Err(Error::InvalidValue {
                field: "time_thresh_minutes",
                message: format!("must be a positive number of minutes, got {}", self.time_thresh_minutes),
            });
        }
        if !self.gap_thresh_minutes.is_finite() || self.gap_thresh_minutes <= 0.0 {
            return Err(Error::InvalidValue {
                field: "gap_thresh_minutes",
                message: format!("must be a positive number of minutes, got {}", self.gap_thresh_minutes),
            });
        }
        Ok(())
    }
}

/// Stay-point clustering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Neighborhood radius, meters. Converted to radians on the unit sphere
    /// before clustering.
    pub distance_m: f64,
    /// Minimum neighborhood size for a core point (the point itself counts).
    pub min_k: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            distance_m: 200.0,
            min_k: 2,
        }
    }
}

impl ClusterConfig {
    /// Validate clustering parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.distance_m.is_finite() || self.distance_m <= 0.0 {
            return Err(Error::InvalidValue {
                field: "distance_m",
                message: format!("must be a positive number of meters, got {}", self.distance_m),
            });
        }
        if self.min_k == 0 {
            return Err(Error::InvalidValue {
                field: "min_k",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Time-window parameters for one anchor identifier (bed-down or work).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Window start, hour of day 0-23.
    pub window_start_hour: u32,
    /// Window end, hour of day 0-23. May be less than the start for windows
    /// wrapping past midnight (e.g. sleep 22 -> 5).
    pub window_end_hour: u32,
    /// Minimum qualifying overlap, hours.
    pub min_duration_hours: f64,
    /// Permissive (sparse) or strict (dense) qualification.
    pub coverage: CoverageMode,
    /// Weekday restriction; `None` accepts every day. Work identification
    /// defaults to Mon-Fri.
    pub work_days: Option<Vec<Weekday>>,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig::sleep()
    }
}

impl AnchorConfig {
    /// Bed-down defaults: 22:00 -> 05:00, 4 h minimum, sparse, any day.
    pub fn sleep() -> Self {
        AnchorConfig {
            window_start_hour: 22,
            window_end_hour: 5,
            min_duration_hours: 4.0,
            coverage: CoverageMode::Sparse,
            work_days: None,
        }
    }

    /// Work defaults: 08:00 -> 18:00, 4 h minimum, sparse, Mon-Fri.
    pub fn work() -> Self {
        AnchorConfig {
            window_start_hour: 8,
            window_end_hour: 18,
            min_duration_hours: 4.0,
            coverage: CoverageMode::Sparse,
            work_days: Some(vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
        }
    }

    /// True when the window wraps past midnight.
    pub fn wraps_midnight(&self) -> bool {
        self.window_end_hour < self.window_start_hour
    }

    /// Validate anchor-window parameters.
    pub fn validate(&self) -> Result<()> {
        if self.window_start_hour > 23 {
            return Err(Error::InvalidValue {
                field: "window_start_hour",
                message: format!("must be an hour of day 0-23, got {}", self.window_start_hour),
            });
        }
        if self.window_end_hour > 23 {
            return Err(Error::InvalidValue {
                field: "window_end_hour",
                message: format!("must be an hour of day 0-23, got {}", self.window_end_hour),
            });
        }
        if !self.min_duration_hours.is_finite() || self.min_duration_hours <= 0.0 {
            return Err(Error::InvalidValue {
                field: "min_duration_hours",
                message: format!("must be a positive number of hours, got {}", self.min_duration_hours),
            });
        }
        if let Some(days) = &self.work_days {
            if days.is_empty() {
                return Err(Error::InvalidValue {
                    field: "work_days",
                    message: "must name at least one weekday when provided".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Profiling parameters: one anchor window per anchor kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Bed-down (candidate home) window.
    pub sleep: AnchorConfig,
    /// Duty (candidate work) window.
    pub work: AnchorConfig,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        // The profiler narrows the work window to typical office arrival.
        let mut work = AnchorConfig::work();
        work.window_start_hour = 9;
        ProfilerConfig {
            sleep: AnchorConfig::sleep(),
            work,
        }
    }
}

impl ProfilerConfig {
    /// Validate both anchor windows.
    pub fn validate(&self) -> Result<()> {
        self.sleep.validate()?;
        self.work.validate()?;
        if self.work.wraps_midnight() {
            return Err(Error::InvalidValue {
                field: "work.window_end_hour",
                message: "work windows must not wrap past midnight".to_string(),
            });
        }
        Ok(())
    }
}

/// Markov transition-model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkovConfig {
    /// Maximum hour delta for a consecutive pair to count as a transition.
    pub time_gap_hours: f64,
    /// Simulated sequence length for `predict`.
    pub length: usize,
    /// Monte-Carlo simulation count. Must be odd so a per-index median is a
    /// representable state.
    pub n_sims: usize,
}

impl Default for MarkovConfig {
    fn default() -> Self {
        MarkovConfig {
            time_gap_hours: 24.0,
            length: 5,
            n_sims: 5,
        }
    }
}

impl MarkovConfig {
    /// Validate model parameters. Even simulation counts fail here, before
    /// any fit or predict call.
    pub fn validate(&self) -> Result<()> {
        if !self.time_gap_hours.is_finite() || self.time_gap_hours <= 0.0 {
            return Err(Error::InvalidValue {
                field: "time_gap_hours",
                message: format!("must be a positive number of hours, got {}", self.time_gap_hours),
            });
        }
        if self.length == 0 {
            return Err(Error::InvalidValue {
                field: "length",
                message: "must be at least 1".to_string(),
            });
        }
        if self.n_sims == 0 {
            return Err(Error::InvalidValue {
                field: "n_sims",
                message: "must be at least 1".to_string(),
            });
        }
        if self.n_sims % 2 == 0 {
            return Err(Error::EvenSimulations { n_sims: self.n_sims });
        }
        Ok(())
    }
}

/// Chronological train/test split parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Trailing fraction of the history held out for evaluation.
    pub test_size: f64,
    /// Length of each disjoint held-out slice.
    pub slice_len: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            test_size: 0.2,
            slice_len: 5,
        }
    }
}

impl SplitConfig {
    /// Validate split parameters.
    pub fn validate(&self) -> Result<()> {
        if !self.test_size.is_finite() || self.test_size <= 0.0 || self.test_size >= 1.0 {
            return Err(Error::InvalidValue {
                field: "test_size",
                message: format!("must lie strictly between 0 and 1, got {}", self.test_size),
            });
        }
        if self.slice_len < 2 {
            return Err(Error::InvalidValue {
                field: "slice_len",
                message: format!("slices shorter than 2 cannot be evaluated, got {}", self.slice_len),
            });
        }
        Ok(())
    }
}

/// Full pipeline configuration: one struct per stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub detector: DetectorConfig,
    pub cluster: ClusterConfig,
    pub profiler: ProfilerConfig,
}

impl PipelineConfig {
    /// Validate every stage's parameters.
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.cluster.validate()?;
        self.profiler.validate()?;
        Ok(())
    }
}
