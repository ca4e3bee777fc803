//! Behavioral scoring primitives.
//!
//! Consistency, entropy, and half-life curves shared by the location
//! profiler and the pattern summary. Degenerate inputs resolve to pinned
//! constants rather than NaN or infinity.

/// Smallest most-frequent value of the sample, with its count.
///
/// Returns None for empty input.
pub fn mode(values: &[f64]) -> Option<(f64, usize)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut best = sorted[0];
    let mut best_count = 0usize;
    let mut run = sorted[0];
    let mut run_count = 0usize;
    for &v in &sorted {
        if v == run {
            run_count += 1;
        } else {
            run = v;
            run_count = 1;
        }
        // Ascending order: a strictly larger run is needed to displace the
        // current best, so ties keep the smallest value.
        if run_count > best_count {
            best = run;
            best_count = run_count;
        }
    }
    Some((best, best_count))
}

/// Consistency score in [0, 1] from a mode-based coefficient of variation.
///
/// CV = sqrt(fraction of values differing from the mode) / mode count,
/// mapped through 1/(CV + 1): zero spread scores 1.0, diffuse samples tend
/// toward 0. Fewer than two samples score 0.0.
pub fn normalized_consistency(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let (mode_value, mode_count) = match mode(values) {
        Some(m) => m,
        None => return 0.0,
    };
    let off_mode = values.iter().filter(|&&v| v != mode_value).count() as f64;
    let mode_std = (off_mode / values.len() as f64).sqrt();
    let mode_cv = mode_std / mode_count as f64;
    1.0 / (mode_cv + 1.0)
}

/// Normalized Shannon entropy of a weight distribution.
///
/// Weights are per-category counts or masses. The normalizer is log2 of
/// `n_bins` when given, otherwise log2 of the number of distinct weight
/// values. Pinned constants for degenerate input: zero or one weight
/// → 1.0 (nothing to distinguish), zero total → 0.0, and a normalizer
/// below two categories → 1.0.
pub fn normalized_entropy(weights: &[f64], n_bins: Option<usize>) -> f64 {
    if weights.len() <= 1 {
        return 1.0;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let shannon: f64 = weights
        .iter()
        .map(|&w| w / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum();

    let n = n_bins.unwrap_or_else(|| distinct_count(weights));
    if n < 2 {
        return 1.0;
    }
    shannon / (n as f64).log2()
}

fn distinct_count(values: &[f64]) -> usize {
    let mut seen = std::collections::HashSet::new();
    for &v in values {
        seen.insert(v.to_bits());
    }
    seen.len()
}

/// Half-life decay curve: exp(ln(0.5) / half_life * x).
///
/// 1.0 at x = 0, 0.5 at x = half_life, tending to 0 as x grows.
pub fn exponential_decay(x: f64, half_life: f64) -> f64 {
    let decay_rate = 0.5_f64.ln() / half_life;
    (decay_rate * x).exp()
}

/// Saturating complement of the half-life decay: 1 - decay(x).
///
/// 0.0 at x = 0, 0.5 at x = half_life, tending to 1 as x grows.
pub fn exponential_saturation(x: f64, half_life: f64) -> f64 {
    1.0 - exponential_decay(x, half_life)
}

/// Harmonic mean of the values.
///
/// Returns 0.0 for empty input or when any value is at or below zero, so a
/// single dead component zeroes the composite.
pub fn harmonic_mean(values: &[f64]) -> f64 {
    if values.is_empty() || values.iter().any(|&v| v <= 0.0) {
        return 0.0;
    }
    let reciprocal_sum: f64 = values.iter().map(|&v| 1.0 / v).sum();
    values.len() as f64 / reciprocal_sum
}
