//! Fuzz target for transition-model configuration parsing.
//!
//! Tests that JSON Markov configuration parsing and chain construction
//! handle arbitrary input without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pol_core::config::MarkovConfig;
use pol_core::strategy::MarkovChain;

fuzz_target!(|data: &[u8]| {
    // Construction validates the configuration; it should never panic
    if let Ok(config) = serde_json::from_slice::<MarkovConfig>(data) {
        let _ = MarkovChain::new(&[1, 2, 3], config);
    }
});
