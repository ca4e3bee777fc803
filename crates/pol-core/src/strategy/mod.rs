//! Next-location prediction: model fitting, simulation, and evaluation.
//!
//! The profile stage turns a subject's history into a chronological sequence
//! of location-id labels. This module predicts where that sequence goes next:
//!
//! - [`markov`]: first-order transition model with Monte-Carlo simulation
//!   and top-k queries; fitting yields a separate fitted type.
//! - [`split`]: chronological train/test splitting, so no future leaks into
//!   training.
//! - [`evaluator`]: next-step and top-k accuracy against held-out slices,
//!   with a random-guess baseline.
//! - [`time_sliced`]: one model per calendar slice (month, weekday, part of
//!   day) for context-dependent routines.

pub mod evaluator;
pub mod markov;
pub mod split;
pub mod time_sliced;

pub use evaluator::{
    EvaluationResult, EvaluationSummary, MarkovEvaluator, StateAccuracy, DEFAULT_TOP_K,
};
pub use markov::{AggregationMethod, FittedMarkovChain, MarkovChain};
pub use split::{train_test_split, TrainTestSplit};
pub use time_sliced::{Observation, SliceBy, SliceKey, TimeSlicedMarkov};
