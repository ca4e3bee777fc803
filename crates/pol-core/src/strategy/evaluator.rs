//! Held-out accuracy scoring for a fitted transition model.
//!
//! The evaluator replays disjoint chronological test slices: for every
//! consecutive (current, next) pair it asks the model for its single best
//! successor and its top-k successors, then counts hits globally and per
//! originating state. `generate_summary` adds a random-guess baseline so the
//! headline number says whether the model beats blind chance.

use std::collections::BTreeMap;

use pol_common::{Error, PipelineStage, Result};
use serde::{Deserialize, Serialize};

use super::markov::FittedMarkovChain;

/// Default top-k width for evaluation reports.
pub const DEFAULT_TOP_K: usize = 3;

/// Hit counters for one originating state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAccuracy {
    /// Pairs where the single best prediction matched the true successor.
    pub next_step_hits: usize,
    /// Pairs where the true successor appeared in the top-k set.
    pub top_k_hits: usize,
    /// Pairs evaluated from this state.
    pub total: usize,
}

impl StateAccuracy {
    /// Next-step hit ratio; 0.0 when nothing was evaluated.
    pub fn next_step_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.next_step_hits as f64 / self.total as f64
        }
    }

    /// Top-k hit ratio; 0.0 when nothing was evaluated.
    pub fn top_k_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.top_k_hits as f64 / self.total as f64
        }
    }
}

/// Aggregate accuracy over every evaluated pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Fraction of pairs where the single best prediction was correct.
    pub next_step_accuracy: f64,
    /// Fraction of pairs where the truth appeared in the top-k set.
    pub top_k_accuracy: f64,
    /// Top-k width the evaluation ran with.
    pub k: usize,
    /// Pairs evaluated across all sequences.
    pub n_pairs: usize,
    /// Sequences long enough to evaluate.
    pub n_sequences: usize,
    /// Sequences shorter than 2, skipped.
    pub n_skipped: usize,
    /// Per-originating-state hit counters, keyed by location id.
    pub per_state: BTreeMap<u32, StateAccuracy>,
}

/// [`EvaluationResult`] plus the random-guess baseline comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub next_step_accuracy: f64,
    pub top_k_accuracy: f64,
    pub k: usize,
    pub n_pairs: usize,
    /// Accuracy of guessing k states uniformly: `min(k, |S|) / |S|`.
    pub random_baseline: f64,
    /// Percentage improvement of top-k accuracy over the baseline.
    pub improvement_over_baseline_pct: f64,
}

/// Scores a fitted model against held-out label sequences.
#[derive(Debug)]
pub struct MarkovEvaluator<'a> {
    model: &'a FittedMarkovChain,
    k: usize,
    result: Option<EvaluationResult>,
}

impl<'a> MarkovEvaluator<'a> {
    /// Creates an evaluator with the given top-k width.
    pub fn new(model: &'a FittedMarkovChain, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(Error::InvalidValue {
                field: "k",
                message: "top-k width must be at least 1".into(),
            });
        }
        Ok(MarkovEvaluator {
            model,
            k,
            result: None,
        })
    }

    /// Replays the test sequences and caches the aggregate result.
    ///
    /// Sequences shorter than 2 carry no transition and are skipped with a
    /// warning. Labels outside the model's state set fail the evaluation.
    pub fn evaluate(&mut self, sequences: &[Vec<u32>]) -> Result<&EvaluationResult> {
        let mut per_state: BTreeMap<u32, StateAccuracy> = BTreeMap::new();
        let mut next_step_hits = 0_usize;
        let mut top_k_hits = 0_usize;
        let mut n_pairs = 0_usize;
        let mut n_sequences = 0_usize;
        let mut n_skipped = 0_usize;

        for sequence in sequences {
            if sequence.len() < 2 {
                n_skipped += 1;
                tracing::warn!(len = sequence.len(), "skipping test sequence with no transition");
                continue;
            }
            n_sequences += 1;
            for pair in sequence.windows(2) {
                let (current, truth) = (pair[0], pair[1]);
                // `current` is validated inside predict_next_k; the truth
                // label needs its own check before it is scored as a miss.
                if self.model.index_of(truth).is_none() {
                    return Err(Error::UnknownState { state: truth });
                }
                let best = self.model.predict_next_k(current, 1)?;
                let top_k = self.model.predict_next_k(current, self.k)?;

                n_pairs += 1;
                let counters = per_state.entry(current).or_default();
                counters.total += 1;
                if best.first() == Some(&truth) {
                    next_step_hits += 1;
                    counters.next_step_hits += 1;
                }
                if top_k.contains(&truth) {
                    top_k_hits += 1;
                    counters.top_k_hits += 1;
                }
            }
        }

        if n_pairs == 0 {
            return Err(Error::InsufficientData {
                stage: PipelineStage::Evaluation,
                needed: 1,
                got: 0,
            });
        }

        let result = EvaluationResult {
            next_step_accuracy: next_step_hits as f64 / n_pairs as f64,
            top_k_accuracy: top_k_hits as f64 / n_pairs as f64,
            k: self.k,
            n_pairs,
            n_sequences,
            n_skipped,
            per_state,
        };
        tracing::info!(
            n_pairs,
            n_sequences,
            n_skipped,
            next_step_accuracy = result.next_step_accuracy,
            top_k_accuracy = result.top_k_accuracy,
            "evaluated transition model"
        );
        Ok(&*self.result.insert(result))
    }

    /// The cached result of the last `evaluate` call.
    pub fn result(&self) -> Result<&EvaluationResult> {
        self.result.as_ref().ok_or(Error::NotFitted("evaluate"))
    }

    /// Compares the cached accuracy against a uniform random-guess baseline.
    pub fn generate_summary(&self) -> Result<EvaluationSummary> {
        let result = self.result()?;
        let n_states = self.model.states().len();
        let random_baseline = self.k.min(n_states) as f64 / n_states as f64;
        let improvement_over_baseline_pct =
            (result.top_k_accuracy - random_baseline) / random_baseline * 100.0;
        Ok(EvaluationSummary {
            next_step_accuracy: result.next_step_accuracy,
            top_k_accuracy: result.top_k_accuracy,
            k: result.k,
            n_pairs: result.n_pairs,
            random_baseline,
            improvement_over_baseline_pct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarkovConfig;
    use crate::strategy::markov::MarkovChain;

    /// 10 -> 20 and 20 -> 10 with probability 1.
    fn cycle_model() -> FittedMarkovChain {
        MarkovChain::new(&[10, 20], MarkovConfig::default())
            .unwrap()
            .fit(&[10, 20, 10, 20, 10], &[0.0, 1.0, 2.0, 3.0, 4.0])
            .unwrap()
    }

    /// Row 10 favors staying at 10 (2 of 3 transitions).
    fn sticky_model() -> FittedMarkovChain {
        MarkovChain::new(&[10, 20], MarkovConfig::default())
            .unwrap()
            .fit(&[10, 10, 10, 20, 10], &[0.0, 1.0, 2.0, 3.0, 4.0])
            .unwrap()
    }

    #[test]
    fn perfect_cycle_scores_full_accuracy() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        let result = evaluator
            .evaluate(&[vec![10, 20, 10, 20], vec![20, 10]])
            .unwrap();
        assert!((result.next_step_accuracy - 1.0).abs() < 1e-12);
        assert!((result.top_k_accuracy - 1.0).abs() < 1e-12);
        assert_eq!(result.n_pairs, 4);
        assert_eq!(result.n_sequences, 2);
        assert_eq!(result.n_skipped, 0);
    }

    #[test]
    fn per_state_counters_split_by_origin() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        let result = evaluator.evaluate(&[vec![10, 20, 10, 20]]).unwrap();
        // Two pairs start from 10, one from 20.
        assert_eq!(result.per_state[&10].total, 2);
        assert_eq!(result.per_state[&10].next_step_hits, 2);
        assert_eq!(result.per_state[&20].total, 1);
        assert!((result.per_state[&20].next_step_ratio() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wider_k_recovers_misses() {
        let model = sticky_model();
        // The best guess from 10 is 10 itself, so the 10 -> 20 pair misses
        // next-step but lands inside the top-2 set.
        let mut narrow = MarkovEvaluator::new(&model, 1).unwrap();
        let miss = narrow.evaluate(&[vec![10, 20]]).unwrap();
        assert!((miss.next_step_accuracy - 0.0).abs() < 1e-12);
        assert!((miss.top_k_accuracy - 0.0).abs() < 1e-12);

        let mut wide = MarkovEvaluator::new(&model, 2).unwrap();
        let hit = wide.evaluate(&[vec![10, 20]]).unwrap();
        assert!((hit.next_step_accuracy - 0.0).abs() < 1e-12);
        assert!((hit.top_k_accuracy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn short_sequences_are_skipped() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        let result = evaluator
            .evaluate(&[vec![10], vec![], vec![10, 20]])
            .unwrap();
        assert_eq!(result.n_skipped, 2);
        assert_eq!(result.n_sequences, 1);
        assert_eq!(result.n_pairs, 1);
    }

    #[test]
    fn nothing_evaluable_is_insufficient_data() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        let err = evaluator.evaluate(&[vec![10]]).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientData {
                stage: PipelineStage::Evaluation,
                ..
            }
        ));
    }

    #[test]
    fn unknown_test_label_fails_evaluation() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        let err = evaluator.evaluate(&[vec![10, 99]]).unwrap_err();
        assert!(matches!(err, Error::UnknownState { state: 99 }));
    }

    #[test]
    fn summary_requires_evaluate_first() {
        let model = cycle_model();
        let evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        let err = evaluator.generate_summary().unwrap_err();
        assert!(matches!(err, Error::NotFitted("evaluate")));
    }

    #[test]
    fn summary_compares_against_random_baseline() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 1).unwrap();
        evaluator.evaluate(&[vec![10, 20, 10]]).unwrap();
        let summary = evaluator.generate_summary().unwrap();
        // Guessing 1 of 2 states at random is right half the time.
        assert!((summary.random_baseline - 0.5).abs() < 1e-12);
        assert!((summary.improvement_over_baseline_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn baseline_saturates_when_k_covers_every_state() {
        let model = cycle_model();
        let mut evaluator = MarkovEvaluator::new(&model, 3).unwrap();
        evaluator.evaluate(&[vec![10, 20, 10]]).unwrap();
        let summary = evaluator.generate_summary().unwrap();
        assert!((summary.random_baseline - 1.0).abs() < 1e-12);
        assert!((summary.improvement_over_baseline_pct - 0.0).abs() < 1e-9);
    }

    #[test]
    fn zero_k_is_rejected_at_construction() {
        let model = cycle_model();
        let err = MarkovEvaluator::new(&model, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "k", .. }));
    }
}
