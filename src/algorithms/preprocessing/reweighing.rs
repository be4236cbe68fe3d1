//! Reweighing (Kamiran & Calders)
//!
//! Assigns each (group, outcome) cell the weight that makes group membership
//! and outcome statistically independent: factor(g, l) = P(g)·P(l) / P(g, l),
//! with every probability taken from the fit dataset's instance weights.
//! Transforming assigns `factor × fit-time weight` per row rather than
//! multiplying whatever weights the input carries, so transforming an
//! already-transformed dataset changes nothing.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{require_group_mass, PreProcessor};
use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::{joint_weight_sum, masked_weight_sum};

/// Cell factors and base weights captured at fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReweighingFactors {
    privileged_favorable: f64,
    privileged_unfavorable: f64,
    unprivileged_favorable: f64,
    unprivileged_unfavorable: f64,
    base_weights: Array1<f64>,
}

/// Pre-processing reweigher balancing group/outcome cells
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reweighing {
    descriptor: GroupDescriptor,
    fitted: Option<ReweighingFactors>,
}

impl Reweighing {
    /// Create an unfitted reweigher for the given group definition
    pub fn new(descriptor: GroupDescriptor) -> Self {
        Self {
            descriptor,
            fitted: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn cell_factor(group_mass: f64, outcome_mass: f64, cell_mass: f64, total: f64) -> f64 {
        // An empty cell never matches a row at transform time
        if cell_mass == 0.0 {
            1.0
        } else {
            group_mass * outcome_mass / (total * cell_mass)
        }
    }
}

impl PreProcessor for Reweighing {
    fn fit(&mut self, dataset: &BinaryLabelDataset) -> Result<()> {
        self.descriptor.validate()?;
        require_group_mass(dataset, &self.descriptor)?;

        let privileged = self.descriptor.mask(dataset.inner(), true)?;
        let unprivileged = self.descriptor.mask(dataset.inner(), false)?;
        let favorable = dataset.favorable_mask();
        let unfavorable: Vec<bool> = favorable.iter().map(|&f| !f).collect();
        let weights = dataset.weights();

        let total = weights.sum();
        let privileged_mass = masked_weight_sum(weights, &privileged);
        let unprivileged_mass = masked_weight_sum(weights, &unprivileged);
        let favorable_mass = masked_weight_sum(weights, &favorable);
        let unfavorable_mass = total - favorable_mass;

        let factors = ReweighingFactors {
            privileged_favorable: Self::cell_factor(
                privileged_mass,
                favorable_mass,
                joint_weight_sum(weights, &privileged, &favorable),
                total,
            ),
            privileged_unfavorable: Self::cell_factor(
                privileged_mass,
                unfavorable_mass,
                joint_weight_sum(weights, &privileged, &unfavorable),
                total,
            ),
            unprivileged_favorable: Self::cell_factor(
                unprivileged_mass,
                favorable_mass,
                joint_weight_sum(weights, &unprivileged, &favorable),
                total,
            ),
            unprivileged_unfavorable: Self::cell_factor(
                unprivileged_mass,
                unfavorable_mass,
                joint_weight_sum(weights, &unprivileged, &unfavorable),
                total,
            ),
            base_weights: weights.clone(),
        };
        debug!(
            privileged_favorable = factors.privileged_favorable,
            privileged_unfavorable = factors.privileged_unfavorable,
            unprivileged_favorable = factors.unprivileged_favorable,
            unprivileged_unfavorable = factors.unprivileged_unfavorable,
            "fitted reweighing factors"
        );
        self.fitted = Some(factors);
        Ok(())
    }

    fn transform(&self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        let factors = self
            .fitted
            .as_ref()
            .ok_or_else(|| EquitasError::NotFitted("Reweighing".to_string()))?;
        if dataset.num_instances() != factors.base_weights.len() {
            return Err(EquitasError::AlignmentError(format!(
                "dataset has {} rows but reweighing was fitted on {}",
                dataset.num_instances(),
                factors.base_weights.len()
            )));
        }

        let privileged = self.descriptor.mask(dataset.inner(), true)?;
        let unprivileged = self.descriptor.mask(dataset.inner(), false)?;
        let favorable = dataset.favorable_mask();

        let mut weights = factors.base_weights.clone();
        for i in 0..weights.len() {
            let factor = match (privileged[i], unprivileged[i], favorable[i]) {
                (true, _, true) => factors.privileged_favorable,
                (true, _, false) => factors.privileged_unfavorable,
                (_, true, true) => factors.unprivileged_favorable,
                (_, true, false) => factors.unprivileged_unfavorable,
                _ => 1.0,
            };
            weights[i] *= factor;
        }

        dataset.with_weights(weights)
    }
}
