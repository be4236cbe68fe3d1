//! Fairness metric engines
//!
//! Two engines compute weighted, group-conditioned statistics:
//!
//! - [`BinaryLabelDatasetMetric`] audits a single dataset: base rates,
//!   statistical parity, disparate impact, consistency
//! - [`ClassificationMetric`] compares ground truth against predictions:
//!   confusion-matrix rates, odds differences, entropy indices
//!
//! Every rate uses instance weights rather than raw counts, and every
//! zero-denominator case fails with an explicit error instead of producing a
//! silent NaN or default. Engines borrow their datasets and hold no caches,
//! so a metric call never observes stale state and never mutates its input.

mod classification_metric;
mod dataset_metric;

pub use classification_metric::ClassificationMetric;
pub use dataset_metric::BinaryLabelDatasetMetric;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Weighted confusion-matrix cells for one group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: f64,
    pub false_positives: f64,
    pub true_negatives: f64,
    pub false_negatives: f64,
}

impl ConfusionMatrix {
    /// Total weighted mass across all four cells
    pub fn total(&self) -> f64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// Weighted mass of actually-favorable instances
    pub fn positives(&self) -> f64 {
        self.true_positives + self.false_negatives
    }

    /// Weighted mass of actually-unfavorable instances
    pub fn negatives(&self) -> f64 {
        self.false_positives + self.true_negatives
    }

    /// Weighted mass of predicted-favorable instances
    pub fn predicted_positives(&self) -> f64 {
        self.true_positives + self.false_positives
    }

    /// Weighted mass of predicted-unfavorable instances
    pub fn predicted_negatives(&self) -> f64 {
        self.true_negatives + self.false_negatives
    }
}

/// Confusion-matrix-derived rates for one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMeasures {
    pub true_positive_rate: f64,
    pub true_negative_rate: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub positive_predictive_value: f64,
    pub negative_predictive_value: f64,
    pub false_discovery_rate: f64,
    pub false_omission_rate: f64,
    pub accuracy: f64,
}

/// Sum of weights over rows where the mask holds
pub(crate) fn masked_weight_sum(weights: &Array1<f64>, mask: &[bool]) -> f64 {
    weights
        .iter()
        .zip(mask)
        .filter(|(_, &selected)| selected)
        .map(|(&w, _)| w)
        .sum()
}

/// Sum of weights over rows where both masks hold
pub(crate) fn joint_weight_sum(weights: &Array1<f64>, first: &[bool], second: &[bool]) -> f64 {
    weights
        .iter()
        .zip(first)
        .zip(second)
        .filter(|((_, &a), &b)| a && b)
        .map(|((&w, _), _)| w)
        .sum()
}

/// Weights with rows outside the mask zeroed out
pub(crate) fn masked_weights(weights: &Array1<f64>, mask: &[bool]) -> Array1<f64> {
    Array1::from_iter(
        weights
            .iter()
            .zip(mask)
            .map(|(&w, &selected)| if selected { w } else { 0.0 }),
    )
}

/// 1.0/0.0 indicator vector from a boolean mask
pub(crate) fn indicator(mask: &[bool]) -> Vec<f64> {
    mask.iter().map(|&m| if m { 1.0 } else { 0.0 }).collect()
}

/// Human-readable name for an `Option<bool>` group condition
pub(crate) fn group_label(privileged: Option<bool>) -> &'static str {
    match privileged {
        Some(true) => "privileged group",
        Some(false) => "unprivileged group",
        None => "dataset",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_weight_sum() {
        let weights = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(masked_weight_sum(&weights, &[true, false, true, false]), 4.0);
        assert_eq!(masked_weight_sum(&weights, &[false; 4]), 0.0);
    }

    #[test]
    fn test_joint_weight_sum() {
        let weights = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let a = [true, true, false, true];
        let b = [true, false, true, true];
        assert_eq!(joint_weight_sum(&weights, &a, &b), 5.0);
    }

    #[test]
    fn test_confusion_matrix_margins() {
        let cm = ConfusionMatrix {
            true_positives: 2.0,
            false_positives: 1.0,
            true_negatives: 3.0,
            false_negatives: 0.5,
        };
        assert_eq!(cm.total(), 6.5);
        assert_eq!(cm.positives(), 2.5);
        assert_eq!(cm.negatives(), 4.0);
        assert_eq!(cm.predicted_positives(), 3.0);
        assert_eq!(cm.predicted_negatives(), 3.5);
    }
}
