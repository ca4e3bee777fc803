//! Pattern of Life Core Library
//!
//! This library provides the core functionality for pattern-of-life analysis:
//! - Stay-point detection over raw position fixes
//! - Density clustering of stay points into named locations
//! - Bed-down and duty-location anchor identification
//! - Behavioral profiling (loyalty, predictability, pattern labels)
//! - Markov next-location prediction and evaluation
//!
//! Stages compose end to end through the `pipeline` module.

pub mod anchor;
pub mod cluster;
pub mod config;
pub mod detect;
pub mod logging;
pub mod pipeline;
pub mod profile;
pub mod strategy;
pub mod summary;
pub mod time_features;

// Re-export synthetic trace builders for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod synthetic;
