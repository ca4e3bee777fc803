//! Error types for the Pattern of Life pipeline.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers that can relax thresholds and rerun
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! Errors can be formatted for human consumption with headline, reason, and fix:
//! ```text
//! ✗ Insufficient Data
//!   Reason: insufficient data for detection: need at least 2, got 0
//!   Fix: Relax the stage thresholds or supply a longer observation history.
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PipelineStage;

/// Result type alias for Pattern of Life operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid configuration or malformed call arguments.
    Config,
    /// Input too small or inconsistent for the requested computation.
    Data,
    /// Model lifecycle violations and degenerate prediction requests.
    Model,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Data => write!(f, "data"),
            ErrorCategory::Model => write!(f, "model"),
        }
    }
}

/// Unified error type for the Pattern of Life pipeline.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("simulation count must be odd, got {n_sims}")]
    EvenSimulations { n_sims: usize },

    #[error("parallel sequences differ in length: {labels} labels vs {hours} hours")]
    LengthMismatch { labels: usize, hours: usize },

    // Data sufficiency errors (20-29)
    #[error("insufficient data for {stage}: need at least {needed}, got {got}")]
    InsufficientData {
        stage: PipelineStage,
        needed: usize,
        got: usize,
    },

    #[error("label {state} is outside the model's state set")]
    UnknownState { state: u32 },

    // Model lifecycle errors (30-39)
    #[error("{0} must run before this operation")]
    NotFitted(&'static str),

    #[error("requested {requested} distinct states but only {available} carry probability mass")]
    DegenerateDistribution { requested: usize, available: usize },

    #[error("no fitted model for slice {slice}")]
    MissingSlice { slice: String },
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Data sufficiency errors
    /// - 30-39: Model lifecycle errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidValue { .. } => 11,
            Error::EvenSimulations { .. } => 12,
            Error::LengthMismatch { .. } => 13,
            Error::InsufficientData { .. } => 20,
            Error::UnknownState { .. } => 21,
            Error::NotFitted(_) => 30,
            Error::DegenerateDistribution { .. } => 31,
            Error::MissingSlice { .. } => 32,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_)
            | Error::InvalidValue { .. }
            | Error::EvenSimulations { .. }
            | Error::LengthMismatch { .. } => ErrorCategory::Config,

            Error::InsufficientData { .. } | Error::UnknownState { .. } => ErrorCategory::Data,

            Error::NotFitted(_)
            | Error::DegenerateDistribution { .. }
            | Error::MissingSlice { .. } => ErrorCategory::Model,
        }
    }

    /// Returns whether rerunning with adjusted thresholds or more history
    /// can succeed.
    ///
    /// `false` means the call itself is wrong and must be corrected.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => false,
            Error::InvalidValue { .. } => false,
            Error::EvenSimulations { .. } => false,
            Error::LengthMismatch { .. } => false,

            // More data or looser thresholds can make these pass.
            Error::InsufficientData { .. } => true,
            Error::UnknownState { .. } => false,

            Error::NotFitted(_) => false,
            Error::DegenerateDistribution { .. } => true,
            // Slices get skipped when their window saw too few observations.
            Error::MissingSlice { .. } => true,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Review the configuration values passed at construction; every stage validates before computing."
            }
            Error::InvalidValue { .. } => {
                "Adjust the named field to a value inside its documented range."
            }
            Error::EvenSimulations { .. } => {
                "Use an odd simulation count so per-index medians are well defined."
            }
            Error::LengthMismatch { .. } => {
                "Supply one hour-of-day value per label; the sequences align index by index."
            }

            Error::InsufficientData { .. } => {
                "Relax the stage thresholds or supply a longer observation history, then rerun the request."
            }
            Error::UnknownState { .. } => {
                "Construct the chain with every label the history can produce, then refit."
            }

            Error::NotFitted(_) => {
                "Run the named operation first; its results are cached on the instance afterward."
            }
            Error::DegenerateDistribution { .. } => {
                "Lower k, or fit on more transitions so the row carries enough non-zero mass."
            }
            Error::MissingSlice { .. } => {
                "Query an available slice, or refit with a longer history so the slice collects enough observations."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidValue { .. } => "Invalid Configuration Value",
            Error::EvenSimulations { .. } => "Invalid Simulation Count",
            Error::LengthMismatch { .. } => "Sequence Length Mismatch",
            Error::InsufficientData { .. } => "Insufficient Data",
            Error::UnknownState { .. } => "Unknown State",
            Error::NotFitted(_) => "Operation Out of Order",
            Error::DegenerateDistribution { .. } => "Degenerate Distribution",
            Error::MissingSlice { .. } => "Missing Slice Model",
        }
    }

    /// Formats headline, reason, and fix for end-user display.
    pub fn user_message(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}
