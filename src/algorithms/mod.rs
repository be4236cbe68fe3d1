//! Bias mitigation algorithms
//!
//! Three algorithm families share the dataset abstraction:
//!
//! - pre-processing ([`PreProcessor`]): transform the training data itself
//! - in-processing ([`InProcessor`]): train a fairness-constrained classifier
//! - post-processing ([`PostProcessor`]): adjust predictions per group
//!
//! All transforms are copy-on-write: they return new datasets and never
//! mutate their inputs, and none of the shipped algorithms resample, so row
//! count and order are preserved throughout. Fitting is the only stateful
//! step; a fitted algorithm can serve transform/predict calls from multiple
//! threads.

pub mod inprocessing;
pub mod postprocessing;
pub mod preprocessing;

pub use inprocessing::{GridSearchReduction, PrejudiceRemover};
pub use postprocessing::{
    CalibratedEqOddsPostprocessing, CostConstraint, FairnessCriterion, RejectOptionClassification,
};
pub use preprocessing::{DisparateImpactRemover, Reweighing};

use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::masked_weight_sum;

/// Pre-processing mitigation: learns from a dataset, emits a transformed one
pub trait PreProcessor: Send + Sync {
    /// Learn transform parameters from the dataset
    fn fit(&mut self, dataset: &BinaryLabelDataset) -> Result<()>;

    /// Apply the fitted transform, returning a new dataset
    fn transform(&self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        self.fit(dataset)?;
        self.transform(dataset)
    }
}

/// In-processing mitigation: trains a fairness-constrained classifier
pub trait InProcessor: Send + Sync {
    /// Train on the dataset
    fn fit(&mut self, dataset: &BinaryLabelDataset) -> Result<()>;

    /// Predict labels and scores for an aligned dataset's features
    fn predict(&self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset>;

    /// Fit and predict on the same dataset
    fn fit_predict(&mut self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        self.fit(dataset)?;
        self.predict(dataset)
    }
}

/// Post-processing mitigation: adjusts classified predictions per group,
/// fitted against ground truth
pub trait PostProcessor: Send + Sync {
    /// Learn adjustment parameters from an aligned (truth, predictions) pair
    fn fit(&mut self, dataset: &BinaryLabelDataset, classified: &BinaryLabelDataset) -> Result<()>;

    /// Adjust a classified dataset's labels and scores
    fn predict(&self, classified: &BinaryLabelDataset) -> Result<BinaryLabelDataset>;

    /// Fit and adjust in one step
    fn fit_predict(
        &mut self,
        dataset: &BinaryLabelDataset,
        classified: &BinaryLabelDataset,
    ) -> Result<BinaryLabelDataset> {
        self.fit(dataset, classified)?;
        self.predict(classified)
    }
}

/// Group-conditioned fitting is undefined when a group carries no weight;
/// every algorithm checks this before touching a model.
pub(crate) fn require_group_mass(
    dataset: &BinaryLabelDataset,
    descriptor: &GroupDescriptor,
) -> Result<()> {
    for privileged in [true, false] {
        let mask = descriptor.mask(dataset.inner(), privileged)?;
        if masked_weight_sum(dataset.weights(), &mask) == 0.0 {
            return Err(EquitasError::InsufficientGroupData(format!(
                "{} group has zero weighted mass",
                if privileged {
                    "privileged"
                } else {
                    "unprivileged"
                }
            )));
        }
    }
    Ok(())
}
