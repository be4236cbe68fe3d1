//! Ground-truth versus prediction comparison

use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::{
    group_label, indicator, masked_weight_sum, ConfusionMatrix, PerformanceMeasures,
};

/// Group-conditioned performance and fairness statistics over a ground-truth
/// dataset and an aligned classified copy.
///
/// Construction refuses misaligned pairs outright, so no metric is ever
/// computed across mismatched rows. Confusion cells are weighted by the
/// ground-truth dataset's instance weights; the classified copy contributes
/// only its labels and scores.
pub struct ClassificationMetric<'a> {
    dataset: &'a BinaryLabelDataset,
    classified: &'a BinaryLabelDataset,
    descriptor: GroupDescriptor,
}

impl<'a> ClassificationMetric<'a> {
    /// Create an engine over an aligned (ground truth, predictions) pair
    pub fn new(
        dataset: &'a BinaryLabelDataset,
        classified: &'a BinaryLabelDataset,
        descriptor: GroupDescriptor,
    ) -> Result<Self> {
        dataset.align(classified)?;
        descriptor.validate()?;
        descriptor.mask(dataset.inner(), true)?;
        descriptor.mask(dataset.inner(), false)?;
        Ok(Self {
            dataset,
            classified,
            descriptor,
        })
    }

    /// Boolean row mask for one side of the group definition
    pub fn group_mask(&self, privileged: bool) -> Result<Vec<bool>> {
        self.descriptor.mask(self.dataset.inner(), privileged)
    }

    fn condition_mask(&self, privileged: Option<bool>) -> Result<Vec<bool>> {
        match privileged {
            Some(side) => self.group_mask(side),
            None => Ok(vec![true; self.dataset.num_instances()]),
        }
    }

    /// Weighted confusion matrix for the selected rows
    pub fn confusion_matrix(&self, privileged: Option<bool>) -> Result<ConfusionMatrix> {
        let mask = self.condition_mask(privileged)?;
        let actual = self.dataset.favorable_mask();
        let predicted = self.classified.favorable_mask();
        let weights = self.dataset.weights();

        let mut cm = ConfusionMatrix {
            true_positives: 0.0,
            false_positives: 0.0,
            true_negatives: 0.0,
            false_negatives: 0.0,
        };
        for i in 0..mask.len() {
            if !mask[i] {
                continue;
            }
            let w = weights[i];
            match (actual[i], predicted[i]) {
                (true, true) => cm.true_positives += w,
                (true, false) => cm.false_negatives += w,
                (false, true) => cm.false_positives += w,
                (false, false) => cm.true_negatives += w,
            }
        }
        Ok(cm)
    }

    pub fn num_true_positives(&self, privileged: Option<bool>) -> Result<f64> {
        Ok(self.confusion_matrix(privileged)?.true_positives)
    }

    pub fn num_false_positives(&self, privileged: Option<bool>) -> Result<f64> {
        Ok(self.confusion_matrix(privileged)?.false_positives)
    }

    pub fn num_true_negatives(&self, privileged: Option<bool>) -> Result<f64> {
        Ok(self.confusion_matrix(privileged)?.true_negatives)
    }

    pub fn num_false_negatives(&self, privileged: Option<bool>) -> Result<f64> {
        Ok(self.confusion_matrix(privileged)?.false_negatives)
    }

    fn checked_rate(
        numerator: f64,
        denominator: f64,
        what: &str,
        privileged: Option<bool>,
    ) -> Result<f64> {
        if denominator == 0.0 {
            return Err(EquitasError::EmptyGroup(format!(
                "{} in the {} has zero weighted mass",
                what,
                group_label(privileged)
            )));
        }
        Ok(numerator / denominator)
    }

    /// Recall on the selected rows: TP / (TP + FN)
    pub fn true_positive_rate(&self, privileged: Option<bool>) -> Result<f64> {
        let cm = self.confusion_matrix(privileged)?;
        Self::checked_rate(cm.true_positives, cm.positives(), "actual favorable mass", privileged)
    }

    /// TN / (TN + FP)
    pub fn true_negative_rate(&self, privileged: Option<bool>) -> Result<f64> {
        let cm = self.confusion_matrix(privileged)?;
        Self::checked_rate(
            cm.true_negatives,
            cm.negatives(),
            "actual unfavorable mass",
            privileged,
        )
    }

    /// FP / (FP + TN)
    pub fn false_positive_rate(&self, privileged: Option<bool>) -> Result<f64> {
        let cm = self.confusion_matrix(privileged)?;
        Self::checked_rate(
            cm.false_positives,
            cm.negatives(),
            "actual unfavorable mass",
            privileged,
        )
    }

    /// FN / (FN + TP)
    pub fn false_negative_rate(&self, privileged: Option<bool>) -> Result<f64> {
        let cm = self.confusion_matrix(privileged)?;
        Self::checked_rate(
            cm.false_negatives,
            cm.positives(),
            "actual favorable mass",
            privileged,
        )
    }

    /// All confusion-derived rates at once; fails if any denominator is empty
    pub fn performance_measures(&self, privileged: Option<bool>) -> Result<PerformanceMeasures> {
        let cm = self.confusion_matrix(privileged)?;
        let positives = cm.positives();
        let negatives = cm.negatives();
        let predicted_positives = cm.predicted_positives();
        let predicted_negatives = cm.predicted_negatives();
        Ok(PerformanceMeasures {
            true_positive_rate: Self::checked_rate(
                cm.true_positives,
                positives,
                "actual favorable mass",
                privileged,
            )?,
            true_negative_rate: Self::checked_rate(
                cm.true_negatives,
                negatives,
                "actual unfavorable mass",
                privileged,
            )?,
            false_positive_rate: Self::checked_rate(
                cm.false_positives,
                negatives,
                "actual unfavorable mass",
                privileged,
            )?,
            false_negative_rate: Self::checked_rate(
                cm.false_negatives,
                positives,
                "actual favorable mass",
                privileged,
            )?,
            positive_predictive_value: Self::checked_rate(
                cm.true_positives,
                predicted_positives,
                "predicted favorable mass",
                privileged,
            )?,
            negative_predictive_value: Self::checked_rate(
                cm.true_negatives,
                predicted_negatives,
                "predicted unfavorable mass",
                privileged,
            )?,
            false_discovery_rate: Self::checked_rate(
                cm.false_positives,
                predicted_positives,
                "predicted favorable mass",
                privileged,
            )?,
            false_omission_rate: Self::checked_rate(
                cm.false_negatives,
                predicted_negatives,
                "predicted unfavorable mass",
                privileged,
            )?,
            accuracy: Self::checked_rate(
                cm.true_positives + cm.true_negatives,
                cm.total(),
                "selected row mass",
                privileged,
            )?,
        })
    }

    /// Weighted fraction of predicted-favorable outcomes in the selected rows
    pub fn selection_rate(&self, privileged: Option<bool>) -> Result<f64> {
        let mask = self.condition_mask(privileged)?;
        let weights = self.dataset.weights();
        let total = masked_weight_sum(weights, &mask);
        if total == 0.0 {
            return Err(EquitasError::EmptyGroup(format!(
                "{} has zero weighted mass",
                group_label(privileged)
            )));
        }
        let predicted = self.classified.favorable_mask();
        let favorable: f64 = weights
            .iter()
            .zip(&mask)
            .zip(&predicted)
            .filter(|((_, &in_group), &fav)| in_group && fav)
            .map(|((&w, _), _)| w)
            .sum();
        Ok(favorable / total)
    }

    /// Fraction of correct predictions: (TP + TN) / total
    pub fn accuracy(&self, privileged: Option<bool>) -> Result<f64> {
        let cm = self.confusion_matrix(privileged)?;
        Self::checked_rate(
            cm.true_positives + cm.true_negatives,
            cm.total(),
            "selected row mass",
            privileged,
        )
    }

    /// 1 - accuracy
    pub fn error_rate(&self, privileged: Option<bool>) -> Result<f64> {
        Ok(1.0 - self.accuracy(privileged)?)
    }

    /// Unprivileged selection rate minus privileged selection rate
    pub fn statistical_parity_difference(&self) -> Result<f64> {
        Ok(self.selection_rate(Some(false))? - self.selection_rate(Some(true))?)
    }

    /// Ratio of unprivileged to privileged selection rate
    pub fn disparate_impact(&self) -> Result<f64> {
        let unprivileged = self.selection_rate(Some(false))?;
        let privileged = self.selection_rate(Some(true))?;
        if privileged == 0.0 {
            return Err(EquitasError::EmptyGroup(
                "privileged selection rate is zero, disparate impact is undefined".to_string(),
            ));
        }
        Ok(unprivileged / privileged)
    }

    /// Difference in true positive rate, unprivileged minus privileged
    pub fn equal_opportunity_difference(&self) -> Result<f64> {
        Ok(self.true_positive_rate(Some(false))? - self.true_positive_rate(Some(true))?)
    }

    /// Mean of the TPR and FPR gaps between the groups
    pub fn average_odds_difference(&self) -> Result<f64> {
        let tpr_gap = self.true_positive_rate(Some(false))? - self.true_positive_rate(Some(true))?;
        let fpr_gap =
            self.false_positive_rate(Some(false))? - self.false_positive_rate(Some(true))?;
        Ok(0.5 * (tpr_gap + fpr_gap))
    }

    /// Mean of the absolute TPR and FPR gaps between the groups
    pub fn average_abs_odds_difference(&self) -> Result<f64> {
        let tpr_gap = self.true_positive_rate(Some(false))? - self.true_positive_rate(Some(true))?;
        let fpr_gap =
            self.false_positive_rate(Some(false))? - self.false_positive_rate(Some(true))?;
        Ok(0.5 * (tpr_gap.abs() + fpr_gap.abs()))
    }

    /// Generalized entropy of the individual benefit distribution
    /// `b_i = 1 + predicted_i - actual_i` over favorable indicators.
    ///
    /// `alpha = 1` gives the Theil index, `alpha = 0` the mean log deviation,
    /// anything else the standard power form. Zero everywhere means every
    /// prediction matches its label. Unweighted, following the individual
    /// (not group) reading of the benefit distribution.
    pub fn generalized_entropy_index(&self, alpha: f64) -> Result<f64> {
        let actual = indicator(&self.dataset.favorable_mask());
        let predicted = indicator(&self.classified.favorable_mask());
        let n = actual.len();
        if n == 0 {
            return Err(EquitasError::EmptyGroup(
                "dataset has no instances".to_string(),
            ));
        }
        let benefits: Vec<f64> = actual
            .iter()
            .zip(&predicted)
            .map(|(&a, &p)| 1.0 + p - a)
            .collect();
        let mean = benefits.iter().sum::<f64>() / n as f64;
        if mean == 0.0 {
            return Err(EquitasError::EmptyGroup(
                "mean benefit is zero, generalized entropy is undefined".to_string(),
            ));
        }

        let value = if (alpha - 1.0).abs() < f64::EPSILON {
            benefits
                .iter()
                .map(|&b| {
                    if b > 0.0 {
                        (b / mean) * (b / mean).ln()
                    } else {
                        0.0
                    }
                })
                .sum::<f64>()
                / n as f64
        } else if alpha.abs() < f64::EPSILON {
            let mut sum = 0.0;
            for &b in &benefits {
                if b <= 0.0 {
                    return Err(EquitasError::ComputationError(
                        "zero benefit makes the mean log deviation undefined".to_string(),
                    ));
                }
                sum += (b / mean).ln();
            }
            -sum / n as f64
        } else {
            let sum: f64 = benefits.iter().map(|&b| (b / mean).powf(alpha) - 1.0).sum();
            sum / (n as f64 * alpha * (alpha - 1.0))
        };

        if !value.is_finite() {
            return Err(EquitasError::ComputationError(format!(
                "generalized entropy index with alpha = {} is not finite",
                alpha
            )));
        }
        Ok(value)
    }

    /// Theil index of the benefit distribution
    pub fn theil_index(&self) -> Result<f64> {
        self.generalized_entropy_index(1.0)
    }
}
