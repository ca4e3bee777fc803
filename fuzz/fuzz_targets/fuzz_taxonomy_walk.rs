//! Fuzz target for stay-point detection and clustering on structured traces.
//!
//! Builds a trace from arbitrary grid hops and time steps, then runs the
//! geometric stages. Neither stage should panic, even on traversal orders a
//! collector would never emit.

#![no_main]

use chrono::DateTime;
use libfuzzer_sys::fuzz_target;
use pol_common::{PositionFix, SubjectId};
use pol_core::cluster::StayPointClusterer;
use pol_core::config::{ClusterConfig, DetectorConfig};
use pol_core::detect::StayPointDetector;

fuzz_target!(|hops: Vec<(i8, i8, u16)>| {
    let mut seconds: i64 = 1_700_000_000;
    let mut fixes = Vec::new();
    for (lat_cell, lon_cell, step_seconds) in hops.into_iter().take(256) {
        let Some(timestamp) = DateTime::from_timestamp(seconds, 0) else {
            return;
        };
        fixes.push(PositionFix {
            subject_id: SubjectId::from("fuzz"),
            lat: f64::from(lat_cell) * 0.001,
            lon: f64::from(lon_cell) * 0.001,
            timestamp: timestamp.fixed_offset(),
        });
        seconds += i64::from(step_seconds);
    }

    let Ok(detector) = StayPointDetector::new(DetectorConfig::default()) else {
        return;
    };
    let Ok(clusterer) = StayPointClusterer::new(ClusterConfig::default()) else {
        return;
    };
    let stays = detector.detect(&fixes);
    let _ = clusterer.cluster(&stays);
});
