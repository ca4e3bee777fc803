//! Fuzz target for fix-stream ingestion through the full pipeline.
//!
//! Fix histories arrive as JSON from external collectors, so the whole
//! taxonomy flow must survive arbitrary coordinates, timestamps, and
//! orderings without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pol_common::PositionFix;
use pol_core::config::PipelineConfig;
use pol_core::pipeline::Pipeline;

fuzz_target!(|data: &[u8]| {
    let Ok(mut fixes) = serde_json::from_slice::<Vec<PositionFix>>(data) else {
        return;
    };
    // Keep per-input cost bounded
    fixes.truncate(512);

    let Ok(mut pipeline) = Pipeline::new(PipelineConfig::default()) else {
        return;
    };
    let _ = pipeline.run(&fixes);
});
