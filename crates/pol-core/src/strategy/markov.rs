//! First-order Markov transition model over location labels.
//!
//! The model lifecycle is split across two types:
//!
//! - [`MarkovChain`] holds the canonical state set and simulation parameters.
//!   It cannot predict.
//! - [`FittedMarkovChain`] is only obtainable from [`MarkovChain::fit`], so a
//!   prediction call against an unfitted model is unrepresentable.
//!
//! Fitting counts consecutive (from, to) label pairs, but only when the pair's
//! hour delta stays within `time_gap_hours`. A pair separated by a long data
//! blackout is not a genuine movement and must not count as one. Rows with no
//! observed outgoing transition fall back to a uniform distribution, so every
//! row is always a valid categorical distribution.
//!
//! All randomness comes through an injected [`rand::Rng`], keeping simulated
//! output reproducible under a seeded generator.

use pol_common::{Error, PipelineStage, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MarkovConfig;

/// How `predict` collapses its simulations into a single sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    /// Per-index median of the simulated state indices. Well defined because
    /// the simulation count is validated odd.
    Median,
    /// Per-index smallest most-frequent simulated state index.
    Mode,
}

/// Unfitted transition model: a canonical state set plus parameters.
#[derive(Debug, Clone)]
pub struct MarkovChain {
    states: Vec<u32>,
    config: MarkovConfig,
}

impl MarkovChain {
    /// Creates an unfitted chain over the given location-id states.
    ///
    /// The state set is sorted and deduplicated so the state/index bijection
    /// is deterministic regardless of input order. Configuration is validated
    /// here, which is where an even simulation count fails.
    pub fn new(states: &[u32], config: MarkovConfig) -> Result<Self> {
        config.validate()?;
        if states.is_empty() {
            return Err(Error::InvalidValue {
                field: "states",
                message: "state set must not be empty".into(),
            });
        }
        let mut states = states.to_vec();
        states.sort_unstable();
        states.dedup();
        Ok(MarkovChain { states, config })
    }

    /// Canonical (sorted, deduplicated) state set.
    pub fn states(&self) -> &[u32] {
        &self.states
    }

    /// Matrix row/column index of a state, if it belongs to the set.
    pub fn index_of(&self, state: u32) -> Option<usize> {
        self.states.binary_search(&state).ok()
    }

    /// Fits the transition matrix from parallel label / hour-of-day sequences.
    ///
    /// Counts `labels[i] -> labels[i + 1]` only when
    /// `|hours[i + 1] - hours[i]| <= time_gap_hours`, then row-normalizes.
    /// States with no observed outgoing transition get a uniform row.
    pub fn fit(&self, labels: &[u32], hours: &[f64]) -> Result<FittedMarkovChain> {
        if labels.len() != hours.len() {
            return Err(Error::LengthMismatch {
                labels: labels.len(),
                hours: hours.len(),
            });
        }
        if labels.len() < 2 {
            return Err(Error::InsufficientData {
                stage: PipelineStage::ModelFit,
                needed: 2,
                got: labels.len(),
            });
        }

        let n = self.states.len();
        let mut counts = vec![vec![0.0_f64; n]; n];
        let mut kept = 0_usize;
        let mut dropped = 0_usize;
        for i in 0..labels.len() - 1 {
            let from = self
                .index_of(labels[i])
                .ok_or(Error::UnknownState { state: labels[i] })?;
            let to = self
                .index_of(labels[i + 1])
                .ok_or(Error::UnknownState { state: labels[i + 1] })?;
            if (hours[i + 1] - hours[i]).abs() <= self.config.time_gap_hours {
                counts[from][to] += 1.0;
                kept += 1;
            } else {
                dropped += 1;
            }
        }

        let mut uniform_rows = 0_usize;
        let matrix: Vec<Vec<f64>> = counts
            .into_iter()
            .map(|row| {
                let total: f64 = row.iter().sum();
                if total > 0.0 {
                    row.into_iter().map(|count| count / total).collect()
                } else {
                    uniform_rows += 1;
                    vec![1.0 / n as f64; n]
                }
            })
            .collect();

        tracing::debug!(
            n_states = n,
            observations = labels.len(),
            transitions_kept = kept,
            transitions_dropped = dropped,
            uniform_rows,
            "fitted transition matrix"
        );

        Ok(FittedMarkovChain {
            states: self.states.clone(),
            config: self.config.clone(),
            matrix,
        })
    }
}

/// Fitted transition model. Read-only: every accessor and prediction borrows
/// immutably, so one fitted instance serves any number of sequential queries.
#[derive(Debug, Clone)]
pub struct FittedMarkovChain {
    states: Vec<u32>,
    config: MarkovConfig,
    matrix: Vec<Vec<f64>>,
}

impl FittedMarkovChain {
    /// Canonical (sorted, deduplicated) state set.
    pub fn states(&self) -> &[u32] {
        &self.states
    }

    /// Matrix row/column index of a state, if it belongs to the set.
    pub fn index_of(&self, state: u32) -> Option<usize> {
        self.states.binary_search(&state).ok()
    }

    /// Row-stochastic transition matrix, indexed like [`Self::states`].
    pub fn transition_matrix(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    /// Parameters the model was fitted under.
    pub fn config(&self) -> &MarkovConfig {
        &self.config
    }

    /// Simulates `n_sims` walks of `length` steps from `start` and aggregates
    /// them index by index with the requested method.
    ///
    /// The first element of every walk is `start` itself; each later step is
    /// a categorical draw from the current row.
    pub fn predict(
        &self,
        start: u32,
        method: AggregationMethod,
        rng: &mut impl Rng,
    ) -> Result<Vec<u32>> {
        let start_index = self.index_of(start).ok_or(Error::UnknownState { state: start })?;
        let length = self.config.length;

        let mut simulations: Vec<Vec<usize>> = Vec::with_capacity(self.config.n_sims);
        for _ in 0..self.config.n_sims {
            let mut walk = Vec::with_capacity(length);
            let mut current = start_index;
            walk.push(current);
            for _ in 1..length {
                // Rows always carry mass after fit; staying put is the
                // harmless answer to a degenerate draw.
                current = sample_weighted(&self.matrix[current], rng).unwrap_or(current);
                walk.push(current);
            }
            simulations.push(walk);
        }

        let mut predicted = Vec::with_capacity(length);
        for position in 0..length {
            let column: Vec<usize> = simulations.iter().map(|walk| walk[position]).collect();
            let index = match method {
                AggregationMethod::Median => median_index(&column),
                AggregationMethod::Mode => mode_index(&column),
            };
            predicted.push(self.states[index]);
        }
        Ok(predicted)
    }

    /// Returns the `min(k, |states|)` most probable successors of `state`,
    /// ordered by non-increasing probability.
    ///
    /// Ties resolve toward the higher state index. That is an implementation
    /// detail of the ordering, not a contract.
    pub fn predict_next_k(&self, state: u32, k: usize) -> Result<Vec<u32>> {
        let row_index = self.index_of(state).ok_or(Error::UnknownState { state })?;
        let row = &self.matrix[row_index];
        let mut order: Vec<usize> = (0..row.len()).collect();
        // Ascending stable sort then reverse: equal probabilities land with
        // the higher index first.
        order.sort_by(|&a, &b| row[a].total_cmp(&row[b]));
        order.reverse();
        order.truncate(k.min(row.len()));
        Ok(order.into_iter().map(|index| self.states[index]).collect())
    }

    /// Draws `k` distinct successors of `state` without replacement, weighted
    /// by the row's probabilities.
    ///
    /// Fails when fewer than `k` states carry non-zero probability; sampling
    /// "k distinct states" from less mass than that is a degenerate request.
    pub fn predict_next_k_stochastic(
        &self,
        state: u32,
        k: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<u32>> {
        let row_index = self.index_of(state).ok_or(Error::UnknownState { state })?;
        let mut weights = self.matrix[row_index].clone();
        let available = weights.iter().filter(|&&w| w > 0.0).count();
        if available < k {
            return Err(Error::DegenerateDistribution {
                requested: k,
                available,
            });
        }

        let mut picks = Vec::with_capacity(k);
        for _ in 0..k {
            let index = sample_weighted(&weights, rng).ok_or(Error::DegenerateDistribution {
                requested: k,
                available,
            })?;
            picks.push(self.states[index]);
            weights[index] = 0.0;
        }
        Ok(picks)
    }
}

/// Draws an index proportionally to non-negative weights. `None` when no
/// weight carries mass.
fn sample_weighted(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    let total: f64 = weights.iter().filter(|&&w| w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let draw = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    let mut last = None;
    for (index, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last = Some(index);
        if draw < cumulative {
            return Some(index);
        }
    }
    // The cumulative sum can fall a few ulps short of `total`.
    last
}

/// Median of a non-empty index column. Odd column lengths make the middle
/// element exact.
fn median_index(column: &[usize]) -> usize {
    debug_assert!(!column.is_empty());
    let mut sorted = column.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}

/// Smallest most-frequent value of a non-empty index column.
fn mode_index(column: &[usize]) -> usize {
    debug_assert!(!column.is_empty());
    let mut sorted = column.to_vec();
    sorted.sort_unstable();
    let mut best = sorted[0];
    let mut best_count = 0_usize;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best_count {
            best_count = j - i;
            best = sorted[i];
        }
        i = j;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    /// Generator that returns the same word forever, pinning
    /// `random::<f64>()` to one known draw.
    struct ConstRng(u64);

    impl RngCore for ConstRng {
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }
        fn next_u64(&mut self) -> u64 {
            self.0
        }
        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }
    }

    fn chain(states: &[u32]) -> MarkovChain {
        MarkovChain::new(states, MarkovConfig::default()).unwrap()
    }

    /// [A, A, B, A, B, B] with A=10, B=20 and uniform 1-hour deltas.
    fn fitted_scenario() -> FittedMarkovChain {
        chain(&[10, 20])
            .fit(&[10, 10, 20, 10, 20, 20], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap()
    }

    // ==== construction ====

    #[test]
    fn construction_canonicalizes_states() {
        let model = chain(&[20, 10, 20]);
        assert_eq!(model.states(), &[10, 20]);
        assert_eq!(model.index_of(10), Some(0));
        assert_eq!(model.index_of(20), Some(1));
        assert_eq!(model.index_of(30), None);
    }

    #[test]
    fn construction_rejects_even_simulation_count() {
        let config = MarkovConfig {
            n_sims: 4,
            ..MarkovConfig::default()
        };
        let err = MarkovChain::new(&[1, 2], config).unwrap_err();
        assert!(matches!(err, Error::EvenSimulations { n_sims: 4 }));
    }

    #[test]
    fn construction_rejects_empty_state_set() {
        let err = MarkovChain::new(&[], MarkovConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "states", .. }));
    }

    // ==== fitting ====

    #[test]
    fn fit_matches_hand_counted_probabilities() {
        let fitted = fitted_scenario();
        let matrix = fitted.transition_matrix();
        assert!((matrix[0][0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((matrix[0][1] - 2.0 / 3.0).abs() < 1e-12);
        assert!((matrix[1][0] - 0.5).abs() < 1e-12);
        assert!((matrix[1][1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn fit_rejects_length_mismatch() {
        let err = chain(&[10, 20]).fit(&[10, 20, 10], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { labels: 3, hours: 2 }));
    }

    #[test]
    fn fit_needs_two_observations() {
        let err = chain(&[10, 20]).fit(&[10], &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                stage: PipelineStage::ModelFit,
                needed: 2,
                got: 1,
            }
        ));
    }

    #[test]
    fn fit_rejects_labels_outside_the_state_set() {
        let err = chain(&[10, 20]).fit(&[10, 99], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::UnknownState { state: 99 }));
    }

    #[test]
    fn long_gaps_do_not_count_as_transitions() {
        // The 30-hour jump exceeds the 24-hour default gap, so 10->20 is
        // never observed and row 10 falls back to uniform.
        let fitted = chain(&[10, 20])
            .fit(&[10, 20, 10], &[0.0, 30.0, 31.0])
            .unwrap();
        let matrix = fitted.transition_matrix();
        assert!((matrix[0][0] - 0.5).abs() < 1e-12);
        assert!((matrix[0][1] - 0.5).abs() < 1e-12);
        assert!((matrix[1][0] - 1.0).abs() < 1e-12);
        assert!((matrix[1][1] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn every_row_sums_to_one() {
        for fitted in [
            fitted_scenario(),
            chain(&[10, 20, 30])
                .fit(&[10, 20, 10, 20], &[1.0, 2.0, 3.0, 4.0])
                .unwrap(),
        ] {
            for row in fitted.transition_matrix() {
                let total: f64 = row.iter().sum();
                assert!((total - 1.0).abs() < 1e-9, "row sums to {total}");
            }
        }
    }

    // ==== deterministic top-k ====

    #[test]
    fn top_k_orders_by_probability() {
        let fitted = fitted_scenario();
        assert_eq!(fitted.predict_next_k(10, 1).unwrap(), vec![20]);
        assert_eq!(fitted.predict_next_k(10, 2).unwrap(), vec![20, 10]);
        // k beyond the state count clamps to every state.
        assert_eq!(fitted.predict_next_k(10, 5).unwrap(), vec![20, 10]);
    }

    #[test]
    fn top_k_ties_favor_the_higher_index() {
        let fitted = fitted_scenario();
        // Row 20 is [0.5, 0.5].
        assert_eq!(fitted.predict_next_k(20, 2).unwrap(), vec![20, 10]);
    }

    #[test]
    fn top_k_rejects_unknown_state() {
        let err = fitted_scenario().predict_next_k(99, 1).unwrap_err();
        assert!(matches!(err, Error::UnknownState { state: 99 }));
    }

    // ==== stochastic top-k ====

    #[test]
    fn stochastic_top_k_draws_without_replacement() {
        let fitted = fitted_scenario();
        // A draw of 0.0 always lands on the first state still carrying mass.
        let mut low = ConstRng(0);
        assert_eq!(
            fitted.predict_next_k_stochastic(10, 2, &mut low).unwrap(),
            vec![10, 20]
        );
        // A draw near 1.0 lands on the last state carrying mass.
        let mut high = ConstRng(u64::MAX);
        assert_eq!(
            fitted.predict_next_k_stochastic(10, 2, &mut high).unwrap(),
            vec![20, 10]
        );
    }

    #[test]
    fn stochastic_top_k_rejects_degenerate_requests() {
        // Row 20 has a single non-zero entry after the gap filter drops the
        // only 10->20 pair.
        let fitted = chain(&[10, 20])
            .fit(&[10, 20, 10], &[0.0, 30.0, 31.0])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let err = fitted
            .predict_next_k_stochastic(20, 2, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DegenerateDistribution {
                requested: 2,
                available: 1,
            }
        ));
    }

    // ==== simulation ====

    #[test]
    fn predict_walks_a_deterministic_cycle() {
        // 10 -> 20 and 20 -> 10 both with probability 1, so every simulated
        // walk alternates and the aggregate is rng-independent.
        let fitted = chain(&[10, 20])
            .fit(&[10, 20, 10, 20, 10], &[0.0, 1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let expected = vec![10, 20, 10, 20, 10];
        assert_eq!(
            fitted.predict(10, AggregationMethod::Median, &mut rng).unwrap(),
            expected
        );
        assert_eq!(
            fitted.predict(10, AggregationMethod::Mode, &mut rng).unwrap(),
            expected
        );
    }

    #[test]
    fn predict_requires_a_known_start_state() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = fitted_scenario()
            .predict(99, AggregationMethod::Mode, &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownState { state: 99 }));
    }

    #[test]
    fn predict_is_reproducible_under_a_fixed_seed() {
        let fitted = fitted_scenario();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(
            fitted.predict(10, AggregationMethod::Mode, &mut a).unwrap(),
            fitted.predict(10, AggregationMethod::Mode, &mut b).unwrap()
        );
    }

    // ==== aggregation helpers ====

    #[test]
    fn median_and_mode_disagree_on_skewed_columns() {
        let column = [0, 0, 1, 2, 2];
        assert_eq!(median_index(&column), 1);
        assert_eq!(mode_index(&column), 0);
    }

    #[test]
    fn mode_prefers_the_smallest_most_frequent_value() {
        assert_eq!(mode_index(&[2, 2, 0, 0, 1]), 0);
        assert_eq!(mode_index(&[3]), 3);
    }

    #[test]
    fn weighted_sampling_skips_zero_mass_entries() {
        let mut low = ConstRng(0);
        assert_eq!(sample_weighted(&[0.0, 0.7, 0.3], &mut low), Some(1));
        assert_eq!(sample_weighted(&[0.0, 0.0], &mut low), None);
    }
}
