//! End-to-end orchestration: fixes in, pattern of life out.
//!
//! `Pipeline::run` wires the stages in data-flow order: stay-point detection,
//! location clustering, behavioral profiling with anchor identification, and
//! the subject-level summary. Each stage logs its counts and elapsed time
//! under a per-run correlation id, and the configuration snapshot is logged
//! at start so a run can be reproduced from its log stream alone.
//!
//! Prediction stays outside: the caller takes the profile table's label
//! sequence and fits a transition model under its own split policy.

use std::time::Instant;

use pol_common::{Error, LocationVisit, PipelineStage, PositionFix, Result, StayPoint, SubjectId};
use serde::{Deserialize, Serialize};

use crate::cluster::StayPointClusterer;
use crate::config::PipelineConfig;
use crate::detect::StayPointDetector;
use crate::logging::generate_run_id;
use crate::profile::{LocationProfile, LocationProfiler};
use crate::summary::PatternSummary;

/// Complete output of one run over a subject's fix history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternOfLife {
    pub subject_id: SubjectId,
    /// Detected stay points, in time order.
    pub stay_points: Vec<StayPoint>,
    /// Clustered location visits, in time order. Noise stays are absent.
    pub visits: Vec<LocationVisit>,
    /// One row per location, ascending by id.
    pub profiles: Vec<LocationProfile>,
    /// Location id of the most probable residence.
    pub likely_home: u32,
    pub summary: PatternSummary,
    /// Davies-Bouldin separation of the clustering; lower is tighter. None
    /// when fewer than two locations were found.
    pub cluster_quality: Option<f64>,
}

/// Runs detection, clustering, and profiling as one unit.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    detector: StayPointDetector,
    clusterer: StayPointClusterer,
    profiler: LocationProfiler,
}

impl Pipeline {
    /// Builds every stage up front, so configuration problems surface here
    /// and never mid-run.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Ok(Pipeline {
            detector: StayPointDetector::new(config.detector.clone())?,
            clusterer: StayPointClusterer::new(config.cluster.clone())?,
            profiler: LocationProfiler::new(config.profiler.clone())?,
            config,
        })
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the full flow over one subject's chronological fixes.
    ///
    /// Halts with a typed `InsufficientData` when detection has too little
    /// input or clustering finds no location; the stage warning preceding
    /// the error carries the counts.
    pub fn run(&mut self, fixes: &[PositionFix]) -> Result<PatternOfLife> {
        if fixes.len() < 2 {
            return Err(Error::InsufficientData {
                stage: PipelineStage::Detection,
                needed: 2,
                got: fixes.len(),
            });
        }
        let subject_id = fixes[0].subject_id.clone();

        let run_id = generate_run_id();
        let span = tracing::info_span!("pipeline_run", run_id = %run_id, subject = %subject_id);
        let _guard = span.enter();

        if let Ok(snapshot) = serde_json::to_string(&self.config) {
            tracing::info!(config = %snapshot, n_fixes = fixes.len(), "starting pattern-of-life run");
        }

        let started = Instant::now();
        let stay_points = self.detector.detect(fixes);
        tracing::info!(
            stage = %PipelineStage::Detection,
            n_fixes = fixes.len(),
            n_stay_points = stay_points.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage complete"
        );

        let started = Instant::now();
        let clustered = self
            .clusterer
            .cluster(&stay_points)
            .ok_or(Error::InsufficientData {
                stage: PipelineStage::Clustering,
                needed: 1,
                got: 0,
            })?;
        tracing::info!(
            stage = %PipelineStage::Clustering,
            n_stay_points = stay_points.len(),
            n_locations = clustered.n_clusters,
            n_visits = clustered.visits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage complete"
        );

        let started = Instant::now();
        let profiles = self.profiler.profile(&clustered.visits)?.to_vec();
        let likely_home = self.profiler.get_likely_home()?;
        tracing::info!(
            stage = %PipelineStage::Profiling,
            n_locations = profiles.len(),
            likely_home,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage complete"
        );

        let summary = PatternSummary::from_profiles(subject_id.clone(), &profiles);
        tracing::info!(
            routine_index = summary.routine_index,
            confidence = %summary.confidence,
            "pattern-of-life run complete"
        );

        Ok(PatternOfLife {
            subject_id,
            stay_points,
            visits: clustered.visits,
            profiles,
            likely_home,
            summary,
            cluster_quality: clustered.quality,
        })
    }
}
