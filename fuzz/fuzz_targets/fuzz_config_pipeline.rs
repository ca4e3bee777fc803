//! Fuzz target for pipeline configuration parsing.
//!
//! Tests that JSON pipeline configuration parsing and validation handle
//! arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pol_core::config::PipelineConfig;

fuzz_target!(|data: &[u8]| {
    // Parsing and validation should never panic, only return an error
    if let Ok(config) = serde_json::from_slice::<PipelineConfig>(data) {
        let _ = config.validate();
    }
});
