//! Record types flowing between pipeline stages.
//!
//! Each stage consumes and produces immutable collections of these records;
//! there is no shared mutable table. Serde derives keep the field order of
//! every record fixed for downstream consumers.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for the individual a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        SubjectId(id.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        SubjectId(id)
    }
}

/// A single timestamped position fix.
///
/// Timestamps carry their UTC offset so that hour-of-day and date-boundary
/// rules observe the subject's local clock, not the collection host's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub subject_id: SubjectId,
    pub lat: f64,
    pub lon: f64,
    pub timestamp: DateTime<FixedOffset>,
}

/// A contiguous window of fixes where the subject lingered.
///
/// Invariants: `arrived <= departed`, `duration_minutes` is exactly the
/// span between them, and stay points of one detection run never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayPoint {
    pub subject_id: SubjectId,
    pub arrived: DateTime<FixedOffset>,
    pub departed: DateTime<FixedOffset>,
    /// Arithmetic mean of the member fix coordinates.
    pub lat: f64,
    pub lon: f64,
    pub duration_minutes: f64,
    pub n_points: usize,
}

impl StayPoint {
    /// Dwell length in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes / 60.0
    }
}

/// One stay assigned to a clustered location.
///
/// `location_id` is a cluster label valid within a single clustering run;
/// noise never surfaces here. `lat`/`lon` are the member stay coordinates,
/// distinct from the cluster's representative centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationVisit {
    pub subject_id: SubjectId,
    pub location_id: u32,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub arrived: DateTime<FixedOffset>,
    pub lat: f64,
    pub lon: f64,
    pub departed: DateTime<FixedOffset>,
    pub duration_minutes: f64,
    pub n_points: usize,
}

impl LocationVisit {
    /// Dwell length in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration_minutes / 60.0
    }
}

/// Window qualification strictness for anchor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMode {
    /// Permissive boolean masks over arrival/departure hours.
    Sparse,
    /// Explicit per-date window intervals with overlap measurement.
    Dense,
}

impl fmt::Display for CoverageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageMode::Sparse => write!(f, "sparse"),
            CoverageMode::Dense => write!(f, "dense"),
        }
    }
}

/// Pipeline stages, used for error attribution and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Detection,
    Clustering,
    AnchorIdentification,
    Profiling,
    ModelFit,
    Prediction,
    Evaluation,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Detection => write!(f, "detection"),
            PipelineStage::Clustering => write!(f, "clustering"),
            PipelineStage::AnchorIdentification => write!(f, "anchor_identification"),
            PipelineStage::Profiling => write!(f, "profiling"),
            PipelineStage::ModelFit => write!(f, "model_fit"),
            PipelineStage::Prediction => write!(f, "prediction"),
            PipelineStage::Evaluation => write!(f, "evaluation"),
        }
    }
}
