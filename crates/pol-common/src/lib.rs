//! Pattern of Life shared types and errors.
//!
//! This crate provides foundational types shared across pol-core modules:
//! - Subject identity and position/stay/visit records
//! - The pipeline stage vocabulary
//! - The error taxonomy with stable codes

pub mod error;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::{CoverageMode, LocationVisit, PipelineStage, PositionFix, StayPoint, SubjectId};
