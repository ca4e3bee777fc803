//! Pattern of Life math utilities.

pub mod geo;
pub mod scoring;

pub use geo::*;
pub use scoring::*;
