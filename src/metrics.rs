// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluation metrics for single- and multi-label classification
//!
//! Predictions and ground truth are compared as label sets:
//! - Example-based: Accuracy (Jaccard), Exact Match, Hamming Loss
//! - Label-based (micro averaged): Precision, Recall, F1, MCC

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of active label indices for one instance
pub type LabelSet = BTreeSet<usize>;

/// Build a label set from the label columns of one row.
///
/// With a single label the value is a class index; otherwise each column is
/// a `0/1` indicator. Missing values contribute nothing.
pub fn label_set(values: &[f64], number_of_labels: usize) -> LabelSet {
    if number_of_labels == 1 {
        values
            .first()
            .filter(|v| v.is_finite() && **v >= 0.0)
            .map(|v| *v as usize)
            .into_iter()
            .collect()
    } else {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 1.0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Micro-averaged confusion counts over all (instance, label) pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Labels predicted and present
    pub tp: usize,
    /// Labels neither predicted nor present
    pub tn: usize,
    /// Labels predicted but absent
    pub fp: usize,
    /// Labels present but not predicted
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Accumulate counts from aligned predicted/actual label sets
    pub fn from_label_sets(predicted: &[LabelSet], actual: &[LabelSet], label_space: usize) -> Self {
        assert_eq!(predicted.len(), actual.len(), "Prediction and ground truth lengths must match");

        let mut matrix = Self::default();
        for (pred, truth) in predicted.iter().zip(actual) {
            let tp = pred.intersection(truth).count();
            let union = pred.union(truth).count();
            matrix.tp += tp;
            matrix.fp += pred.len() - tp;
            matrix.fn_ += truth.len() - tp;
            matrix.tn = matrix.tn.saturating_add(label_space.saturating_sub(union));
        }
        matrix
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall: TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1_score(&self) -> f64 {
        self.f_beta_score(1.0)
    }

    /// F-beta Score: (1 + beta^2) * (Precision * Recall) / (beta^2 * Precision + Recall)
    pub fn f_beta_score(&self, beta: f64) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let beta_sq = beta * beta;
        let denom = beta_sq * precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        (1.0 + beta_sq) * precision * recall / denom
    }

    /// Matthews Correlation Coefficient, in [-1, 1]
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_ as f64;

        let numerator = tp * tn - fp * fn_;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();

        if denominator == 0.0 {
            return 0.0;
        }
        numerator / denominator
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Full evaluation over a test matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub confusion_matrix: ConfusionMatrix,
    /// Mean Jaccard similarity of predicted and actual label sets
    pub accuracy: f64,
    pub exact_match: f64,
    pub hamming_loss: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub mcc: f64,
    /// Fraction of instances at least one rule matched
    pub coverage: f64,
    pub support: usize,
}

impl EvaluationMetrics {
    /// Metric names in the order `values()` returns them
    pub const NAMES: [&'static str; 8] = [
        "accuracy",
        "exact match",
        "hamming loss",
        "precision",
        "recall",
        "f-measure",
        "mcc",
        "coverage",
    ];

    pub fn from_label_sets(predicted: &[LabelSet], actual: &[LabelSet], label_space: usize, covered: usize) -> Self {
        let confusion_matrix = ConfusionMatrix::from_label_sets(predicted, actual, label_space);
        let n = actual.len();

        let mut jaccard = 0.0;
        let mut exact = 0usize;
        let mut symmetric_difference = 0usize;
        for (pred, truth) in predicted.iter().zip(actual) {
            let union = pred.union(truth).count();
            let inter = pred.intersection(truth).count();
            jaccard += if union == 0 { 1.0 } else { inter as f64 / union as f64 };
            if pred == truth {
                exact += 1;
            }
            symmetric_difference += union - inter;
        }

        let (accuracy, exact_match, hamming_loss, coverage) = if n == 0 {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            (
                jaccard / n as f64,
                exact as f64 / n as f64,
                symmetric_difference as f64 / (n as f64 * label_space.max(1) as f64),
                covered as f64 / n as f64,
            )
        };

        Self {
            accuracy,
            exact_match,
            hamming_loss,
            precision: confusion_matrix.precision(),
            recall: confusion_matrix.recall(),
            f1_score: confusion_matrix.f1_score(),
            mcc: confusion_matrix.mcc(),
            coverage,
            support: n,
            confusion_matrix,
        }
    }

    /// Values aligned with [`EvaluationMetrics::NAMES`]
    pub fn values(&self) -> Vec<f64> {
        vec![
            self.accuracy,
            self.exact_match,
            self.hamming_loss,
            self.precision,
            self.recall,
            self.f1_score,
            self.mcc,
            self.coverage,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[usize]) -> LabelSet {
        items.iter().copied().collect()
    }

    #[test]
    fn test_label_set_single_and_multi() {
        assert_eq!(label_set(&[2.0], 1), set(&[2]));
        assert_eq!(label_set(&[f64::NAN], 1), set(&[]));
        assert_eq!(label_set(&[1.0, 0.0, 1.0], 3), set(&[0, 2]));
    }

    #[test]
    fn test_perfect_predictions() {
        let actual = vec![set(&[0]), set(&[1]), set(&[0, 1])];
        let metrics = EvaluationMetrics::from_label_sets(&actual, &actual, 2, 3);

        assert!((metrics.accuracy - 1.0).abs() < 1e-9);
        assert!((metrics.exact_match - 1.0).abs() < 1e-9);
        assert!(metrics.hamming_loss.abs() < 1e-9);
        assert!((metrics.f1_score - 1.0).abs() < 1e-9);
        assert!((metrics.mcc - 1.0).abs() < 1e-9);
        assert!((metrics.coverage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_multi_label() {
        let predicted = vec![set(&[0, 1]), set(&[2])];
        let actual = vec![set(&[0]), set(&[1, 2])];
        let metrics = EvaluationMetrics::from_label_sets(&predicted, &actual, 3, 2);

        // jaccard: 1/2 and 1/2
        assert!((metrics.accuracy - 0.5).abs() < 1e-9);
        assert_eq!(metrics.exact_match, 0.0);
        // symmetric differences 1 + 1 over 2 * 3 label slots
        assert!((metrics.hamming_loss - 2.0 / 6.0).abs() < 1e-9);
        assert_eq!(metrics.confusion_matrix.tp, 2);
        assert_eq!(metrics.confusion_matrix.fp, 1);
        assert_eq!(metrics.confusion_matrix.fn_, 1);
        assert_eq!(metrics.confusion_matrix.tn, 2);
        assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_evaluation() {
        let metrics = EvaluationMetrics::from_label_sets(&[], &[], 2, 0);
        assert_eq!(metrics.support, 0);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.values().len(), EvaluationMetrics::NAMES.len());
    }
}
