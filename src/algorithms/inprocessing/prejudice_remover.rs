//! Prejudice remover (Kamishima et al.)
//!
//! Logistic regression with an extra regularization term that penalizes the
//! squared gap between the mean predicted probability of the unprivileged
//! and privileged groups. `eta` scales the penalty: 0 recovers a plain
//! weighted logistic fit, larger values push the group means together at the
//! cost of raw accuracy.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{require_group_mass, InProcessor};
use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::{masked_weight_sum, masked_weights};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedModel {
    coefficients: Array1<f64>,
    intercept: f64,
}

/// Fairness-regularized logistic classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrejudiceRemover {
    descriptor: GroupDescriptor,
    eta: f64,
    alpha: f64,
    learning_rate: f64,
    max_iter: usize,
    tol: f64,
    fitted: Option<FittedModel>,
}

impl PrejudiceRemover {
    pub fn new(descriptor: GroupDescriptor) -> Self {
        Self {
            descriptor,
            eta: 1.0,
            alpha: 0.01,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
            fitted: None,
        }
    }

    /// Set the fairness penalty strength; negative values are treated as 0
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta.max(0.0);
        self
    }

    /// Set the L2 regularization strength on the coefficients
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn probabilities(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self
            .fitted
            .as_ref()
            .ok_or_else(|| EquitasError::NotFitted("PrejudiceRemover".to_string()))?;
        if x.ncols() != model.coefficients.len() {
            return Err(EquitasError::ShapeError {
                expected: format!("{} features", model.coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let z = x.dot(&model.coefficients) + model.intercept;
        Ok(z.mapv(sigmoid))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl InProcessor for PrejudiceRemover {
    fn fit(&mut self, dataset: &BinaryLabelDataset) -> Result<()> {
        self.descriptor.validate()?;
        require_group_mass(dataset, &self.descriptor)?;

        let x = dataset.features();
        let n = x.nrows();
        let weights = dataset.weights().clone();
        let total = weights.sum();
        if total <= 0.0 {
            return Err(EquitasError::ValidationError(
                "instance weights sum to zero".to_string(),
            ));
        }

        let favorable = dataset.favorable_mask();
        let y = Array1::from(
            favorable
                .iter()
                .map(|&f| if f { 1.0 } else { 0.0 })
                .collect::<Vec<f64>>(),
        );

        let privileged_mask = self.descriptor.mask(dataset.inner(), true)?;
        let unprivileged_mask = self.descriptor.mask(dataset.inner(), false)?;
        let privileged_w = masked_weights(&weights, &privileged_mask);
        let unprivileged_w = masked_weights(&weights, &unprivileged_mask);
        let privileged_total = masked_weight_sum(&weights, &privileged_mask);
        let unprivileged_total = masked_weight_sum(&weights, &unprivileged_mask);

        let mut coefficients = Array1::<f64>::zeros(x.ncols());
        let mut intercept = 0.0;

        for iteration in 0..self.max_iter {
            let z = x.dot(&coefficients) + intercept;
            let probs = z.mapv(sigmoid);

            // Weighted cross-entropy gradient
            let errors = (&probs - &y) * &weights;
            let mut dw = x.t().dot(&errors) / total + self.alpha * &coefficients;
            let mut db = errors.sum() / total;

            // Penalty gradient: d/dw of eta * gap^2 where gap is the
            // difference of group-mean probabilities
            if self.eta > 0.0 {
                let privileged_mean =
                    (&probs * &privileged_w).sum() / privileged_total;
                let unprivileged_mean =
                    (&probs * &unprivileged_w).sum() / unprivileged_total;
                let gap = unprivileged_mean - privileged_mean;

                let slope = probs.mapv(|p| p * (1.0 - p));
                let gap_grad = (&slope * &unprivileged_w) / unprivileged_total
                    - (&slope * &privileged_w) / privileged_total;
                dw = dw + 2.0 * self.eta * gap * x.t().dot(&gap_grad);
                db += 2.0 * self.eta * gap * gap_grad.sum();
            }

            coefficients = coefficients - self.learning_rate * &dw;
            intercept -= self.learning_rate * db;

            let grad_norm = dw.mapv(|g| g * g).sum().sqrt();
            if grad_norm < self.tol {
                debug!(iteration, grad_norm, "prejudice remover converged");
                break;
            }
        }

        debug!(
            instances = n,
            eta = self.eta,
            "fitted prejudice remover"
        );
        self.fitted = Some(FittedModel {
            coefficients,
            intercept,
        });
        Ok(())
    }

    fn predict(&self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        let probs = self.probabilities(dataset.features())?;
        let favorable = dataset.favorable_label();
        let unfavorable = dataset.unfavorable_label();
        let labels = probs.mapv(|p| if p >= 0.5 { favorable } else { unfavorable });
        dataset.with_labels(labels)?.with_scores(probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{ProtectedAttribute, StructuredDataset};
    use crate::metrics::BinaryLabelDatasetMetric;
    use ndarray::array;

    fn biased_dataset() -> BinaryLabelDataset {
        // Outcome tracks group membership almost perfectly
        let features = array![
            [1.0, 2.0],
            [1.0, 1.5],
            [1.0, 1.8],
            [1.0, 0.2],
            [0.0, 0.4],
            [0.0, 0.1],
            [0.0, 0.3],
            [0.0, 1.9],
        ];
        let labels = Array1::from(vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let inner = StructuredDataset::new(
            &["group", "signal"],
            features,
            "outcome",
            labels,
            vec![ProtectedAttribute::new("group", &[1.0], &[0.0])],
        )
        .unwrap();
        BinaryLabelDataset::new(inner, 1.0, 0.0).unwrap()
    }

    fn descriptor() -> GroupDescriptor {
        GroupDescriptor::new()
            .with_privileged("group", &[1.0])
            .with_unprivileged("group", &[0.0])
    }

    fn parity_gap(dataset: &BinaryLabelDataset) -> f64 {
        BinaryLabelDatasetMetric::new(dataset, descriptor())
            .unwrap()
            .statistical_parity_difference()
            .unwrap()
    }

    #[test]
    fn test_zero_eta_matches_plain_logistic_shape() {
        let dataset = biased_dataset();
        let mut remover = PrejudiceRemover::new(descriptor()).with_eta(0.0);
        remover.fit(&dataset).unwrap();
        let predicted = remover.predict(&dataset).unwrap();
        assert_eq!(predicted.num_instances(), dataset.num_instances());
        for &score in predicted.scores() {
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_penalty_shrinks_parity_gap() {
        let dataset = biased_dataset();

        let mut plain = PrejudiceRemover::new(descriptor()).with_eta(0.0);
        let baseline = plain.fit_predict(&dataset).unwrap();

        let mut fair = PrejudiceRemover::new(descriptor()).with_eta(5.0);
        let adjusted = fair.fit_predict(&dataset).unwrap();

        assert!(parity_gap(&adjusted).abs() <= parity_gap(&baseline).abs() + 1e-9);
    }

    #[test]
    fn test_predictions_use_label_encoding() {
        let dataset = biased_dataset();
        let mut remover = PrejudiceRemover::new(descriptor());
        let predicted = remover.fit_predict(&dataset).unwrap();
        for &label in predicted.labels() {
            assert!(label == 1.0 || label == 0.0);
        }
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let remover = PrejudiceRemover::new(descriptor());
        assert!(matches!(
            remover.predict(&biased_dataset()),
            Err(EquitasError::NotFitted(_))
        ));
    }

    #[test]
    fn test_feature_count_mismatch_fails() {
        let dataset = biased_dataset();
        let mut remover = PrejudiceRemover::new(descriptor());
        remover.fit(&dataset).unwrap();

        let narrow = StructuredDataset::new(
            &["group"],
            array![[1.0], [0.0]],
            "outcome",
            Array1::from(vec![1.0, 0.0]),
            vec![ProtectedAttribute::new("group", &[1.0], &[0.0])],
        )
        .unwrap();
        let narrow = BinaryLabelDataset::new(narrow, 1.0, 0.0).unwrap();
        assert!(matches!(
            remover.predict(&narrow),
            Err(EquitasError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_fit_rejects_zero_weight_group() {
        let dataset = biased_dataset();
        let zeroed = dataset
            .with_weights(Array1::from(vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        let mut remover = PrejudiceRemover::new(descriptor());
        assert!(matches!(
            remover.fit(&zeroed),
            Err(EquitasError::InsufficientGroupData(_))
        ));
        assert!(!remover.is_fitted());
    }

    #[test]
    fn test_negative_eta_is_clamped_to_zero() {
        let remover = PrejudiceRemover::new(descriptor()).with_eta(-3.0);
        assert_eq!(remover.eta, 0.0);
    }
}
