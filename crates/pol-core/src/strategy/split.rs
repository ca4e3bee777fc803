//! Chronological train/test splitting for held-out evaluation.
//!
//! Label histories are ordered in time, so a random split would leak future
//! behavior into training. The split here is strictly chronological: the
//! leading fraction trains, the trailing fraction is cut into disjoint
//! consecutive slices shaped for the evaluator.

use pol_common::{Error, Result};

use crate::config::SplitConfig;

/// Output of [`train_test_split`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    /// Leading labels, aligned with `train_hours`.
    pub train_labels: Vec<u32>,
    /// Leading hour-of-day values, aligned with `train_labels`.
    pub train_hours: Vec<f64>,
    /// Disjoint consecutive slices of the held-out tail. Evaluation consumes
    /// labels only.
    pub test_slices: Vec<Vec<u32>>,
}

/// Splits parallel label/hour sequences chronologically.
///
/// The leading `1 - test_size` fraction becomes the training pair; the tail
/// is cut into disjoint slices of `slice_len`. A final remnant shorter than 2
/// carries no transition and is dropped.
pub fn train_test_split(
    labels: &[u32],
    hours: &[f64],
    config: &SplitConfig,
) -> Result<TrainTestSplit> {
    config.validate()?;
    if labels.len() != hours.len() {
        return Err(Error::LengthMismatch {
            labels: labels.len(),
            hours: hours.len(),
        });
    }

    let train_len = ((1.0 - config.test_size) * labels.len() as f64).floor() as usize;
    let held_out = &labels[train_len..];

    let mut test_slices = Vec::new();
    let mut start = 0;
    while start + config.slice_len <= held_out.len() {
        test_slices.push(held_out[start..start + config.slice_len].to_vec());
        start += config.slice_len;
    }
    let remnant = held_out.len() - start;
    if remnant >= 2 {
        test_slices.push(held_out[start..].to_vec());
    } else if remnant > 0 {
        tracing::debug!(remnant, "dropping held-out remnant too short to evaluate");
    }

    if test_slices.is_empty() {
        tracing::warn!(
            n = labels.len(),
            train_len,
            "history too short to hold out any test slice"
        );
    }

    Ok(TrainTestSplit {
        train_labels: labels[..train_len].to_vec(),
        train_hours: hours[..train_len].to_vec(),
        test_slices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn default_split_holds_out_the_trailing_fifth() {
        let labels: Vec<u32> = vec![1, 1, 2, 1, 2, 1, 1, 2, 1, 2];
        let split = train_test_split(&labels, &hours(10), &SplitConfig::default()).unwrap();
        assert_eq!(split.train_labels, labels[..8]);
        assert_eq!(split.train_hours, hours(10)[..8]);
        // The 2-point tail is shorter than slice_len but still evaluable.
        assert_eq!(split.test_slices, vec![vec![1, 2]]);
    }

    #[test]
    fn tail_is_cut_into_disjoint_slices() {
        let labels: Vec<u32> = (0..14).collect();
        let config = SplitConfig {
            test_size: 0.5,
            slice_len: 3,
        };
        let split = train_test_split(&labels, &hours(14), &config).unwrap();
        assert_eq!(split.train_labels.len(), 7);
        // Held-out tail of 7: two full slices, remnant of 1 dropped.
        assert_eq!(
            split.test_slices,
            vec![vec![7, 8, 9], vec![10, 11, 12]]
        );
    }

    #[test]
    fn remnant_of_two_is_kept() {
        let labels: Vec<u32> = (0..14).collect();
        let config = SplitConfig {
            test_size: 0.5,
            slice_len: 5,
        };
        let split = train_test_split(&labels, &hours(14), &config).unwrap();
        assert_eq!(
            split.test_slices,
            vec![vec![7, 8, 9, 10, 11], vec![12, 13]]
        );
        // Slices partition the whole held-out tail.
        let rebuilt: Vec<u32> = split.test_slices.concat();
        assert_eq!(rebuilt, labels[7..]);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let err = train_test_split(&[1, 2, 3], &[0.0, 1.0], &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { labels: 3, hours: 2 }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SplitConfig {
            test_size: 1.5,
            slice_len: 5,
        };
        let err = train_test_split(&[1, 2], &[0.0, 1.0], &config).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { field: "test_size", .. }));
    }

    #[test]
    fn empty_history_yields_empty_split() {
        let split = train_test_split(&[], &[], &SplitConfig::default()).unwrap();
        assert!(split.train_labels.is_empty());
        assert!(split.test_slices.is_empty());
    }
}
