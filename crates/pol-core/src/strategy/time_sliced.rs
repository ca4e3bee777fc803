//! Per-slice transition models keyed by calendar context.
//!
//! A single global matrix blurs weekday commutes into weekend behavior. This
//! manager partitions the history by month, weekday, or part of day, fits one
//! chain per slice under a shared configuration, and answers queries per
//! slice. Slices with fewer than 2 observations cannot carry a transition and
//! are skipped rather than failing the whole partition.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Weekday};
use pol_common::{Error, PipelineStage, Result};
use serde::{Deserialize, Serialize};

use crate::config::MarkovConfig;
use crate::strategy::markov::{FittedMarkovChain, MarkovChain};
use crate::time_features::{month_of, weekday_of, TimeOfDay};

/// Which calendar feature partitions the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceBy {
    Month,
    Weekday,
    TimeOfDay,
}

/// Identifies one fitted slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SliceKey {
    /// Calendar month, 1 through 12.
    Month(u32),
    Weekday(Weekday),
    TimeOfDay(TimeOfDay),
}

impl SliceKey {
    /// Sort rank inside a partition: months by number, weekdays from Monday,
    /// parts of day from morning.
    fn ordinal(&self) -> u32 {
        match self {
            SliceKey::Month(month) => *month,
            SliceKey::Weekday(weekday) => weekday.num_days_from_monday(),
            SliceKey::TimeOfDay(time_of_day) => *time_of_day as u32,
        }
    }
}

impl std::fmt::Display for SliceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceKey::Month(month) => write!(f, "month:{month}"),
            SliceKey::Weekday(weekday) => write!(f, "weekday:{weekday}"),
            SliceKey::TimeOfDay(time_of_day) => write!(f, "time:{time_of_day}"),
        }
    }
}

/// One labeled point of a subject's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Location-id label.
    pub label: u32,
    /// Hour value fed to the transition gap rule, usually the local
    /// hour of day.
    pub hour: f64,
    /// Timestamp the slicing key is derived from.
    pub timestamp: DateTime<FixedOffset>,
}

/// A family of transition models, one per observed calendar slice.
#[derive(Debug, Clone)]
pub struct TimeSlicedMarkov {
    slice_by: SliceBy,
    states: Vec<u32>,
    models: HashMap<SliceKey, FittedMarkovChain>,
}

impl TimeSlicedMarkov {
    /// Partitions the history and fits one chain per slice.
    ///
    /// Every slice shares the global state set, so matrices are comparable
    /// across slices. Slices with fewer than 2 observations are skipped with
    /// a warning.
    pub fn fit(
        slice_by: SliceBy,
        observations: &[Observation],
        config: MarkovConfig,
    ) -> Result<Self> {
        config.validate()?;
        if observations.len() < 2 {
            return Err(Error::InsufficientData {
                stage: PipelineStage::ModelFit,
                needed: 2,
                got: observations.len(),
            });
        }

        let mut states: Vec<u32> = observations.iter().map(|o| o.label).collect();
        states.sort_unstable();
        states.dedup();

        let mut partitions: HashMap<SliceKey, (Vec<u32>, Vec<f64>)> = HashMap::new();
        for observation in observations {
            let key = key_for(slice_by, &observation.timestamp);
            let (labels, hours) = partitions.entry(key).or_default();
            labels.push(observation.label);
            hours.push(observation.hour);
        }

        let mut models = HashMap::new();
        let mut skipped = 0_usize;
        for (key, (labels, hours)) in partitions {
            if labels.len() < 2 {
                skipped += 1;
                tracing::warn!(
                    slice = %key,
                    n_observations = labels.len(),
                    "skipping slice with too few observations"
                );
                continue;
            }
            let chain = MarkovChain::new(&states, config.clone())?;
            models.insert(key, chain.fit(&labels, &hours)?);
        }

        tracing::info!(
            slice_by = ?slice_by,
            n_states = states.len(),
            n_slices = models.len(),
            n_skipped = skipped,
            "fitted time-sliced transition models"
        );

        Ok(TimeSlicedMarkov {
            slice_by,
            states,
            models,
        })
    }

    /// The feature this partition was sliced by.
    pub fn slice_by(&self) -> SliceBy {
        self.slice_by
    }

    /// Global state set shared by every slice.
    pub fn states(&self) -> &[u32] {
        &self.states
    }

    /// Fitted slice keys in calendar order.
    pub fn slice_keys(&self) -> Vec<SliceKey> {
        let mut keys: Vec<SliceKey> = self.models.keys().copied().collect();
        keys.sort_by_key(SliceKey::ordinal);
        keys
    }

    /// The fitted model for one slice. Skipped and never-observed slices
    /// answer with a [`Error::MissingSlice`] miss.
    pub fn model(&self, key: SliceKey) -> Result<&FittedMarkovChain> {
        self.models
            .get(&key)
            .ok_or_else(|| Error::MissingSlice {
                slice: key.to_string(),
            })
    }

    /// Transition matrix of one slice.
    pub fn transition_matrix(&self, key: SliceKey) -> Result<&[Vec<f64>]> {
        Ok(self.model(key)?.transition_matrix())
    }

    /// Top-k successors of `state` inside one slice.
    pub fn predict_next_k(&self, key: SliceKey, state: u32, k: usize) -> Result<Vec<u32>> {
        self.model(key)?.predict_next_k(state, k)
    }
}

fn key_for(slice_by: SliceBy, timestamp: &DateTime<FixedOffset>) -> SliceKey {
    match slice_by {
        SliceBy::Month => SliceKey::Month(month_of(timestamp)),
        SliceBy::Weekday => SliceKey::Weekday(weekday_of(timestamp)),
        SliceBy::TimeOfDay => SliceKey::TimeOfDay(TimeOfDay::of(timestamp)),
    }
}
