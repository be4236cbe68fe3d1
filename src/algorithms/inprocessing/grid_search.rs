//! Grid search reduction (Agarwal et al.)
//!
//! Reduces statistical-parity-constrained classification to a sequence of
//! cost-sensitive problems. Each Lagrange multiplier on the grid turns the
//! parity constraint into per-instance costs; the wrapped estimator is
//! retrained on the induced relabeling with the cost magnitudes as sample
//! weights, and the candidate with the lowest weighted error among those
//! within the constraint bound wins.

use ndarray::Array1;
use tracing::{debug, warn};

use crate::algorithms::{require_group_mass, InProcessor};
use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::masked_weight_sum;
use crate::model::Estimator;

#[derive(Debug, Clone)]
struct Candidate<E> {
    model: E,
    multiplier: f64,
    error: f64,
    violation: f64,
}

/// Constrained classifier wrapping any [`Estimator`]
#[derive(Debug, Clone)]
pub struct GridSearchReduction<E: Estimator + Clone> {
    descriptor: GroupDescriptor,
    prototype: E,
    grid_size: usize,
    grid_limit: f64,
    constraint_bound: f64,
    fitted: Option<Candidate<E>>,
}

impl<E: Estimator + Clone> GridSearchReduction<E> {
    /// Create an unfitted reduction around a prototype estimator; each grid
    /// point trains a fresh clone of it
    pub fn new(descriptor: GroupDescriptor, prototype: E) -> Self {
        Self {
            descriptor,
            prototype,
            grid_size: 11,
            grid_limit: 2.0,
            constraint_bound: 0.05,
            fitted: None,
        }
    }

    /// Set the number of multipliers to try; values below 2 are raised to 2
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size.max(2);
        self
    }

    /// Set the half-width of the symmetric multiplier grid
    pub fn with_grid_limit(mut self, grid_limit: f64) -> Self {
        self.grid_limit = grid_limit.abs();
        self
    }

    /// Set the tolerated selection-rate difference between the groups
    pub fn with_constraint_bound(mut self, bound: f64) -> Self {
        self.constraint_bound = bound.abs();
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Multiplier of the winning candidate, once fitted
    pub fn selected_multiplier(&self) -> Option<f64> {
        self.fitted.as_ref().map(|c| c.multiplier)
    }

    fn grid(&self) -> Vec<f64> {
        (0..self.grid_size)
            .map(|k| {
                -self.grid_limit
                    + 2.0 * self.grid_limit * k as f64 / (self.grid_size - 1) as f64
            })
            .collect()
    }
}

impl<E: Estimator + Clone> InProcessor for GridSearchReduction<E> {
    fn fit(&mut self, dataset: &BinaryLabelDataset) -> Result<()> {
        self.descriptor.validate()?;
        require_group_mass(dataset, &self.descriptor)?;

        let x = dataset.features();
        let weights = dataset.weights();
        let total = weights.sum();
        if total <= 0.0 {
            return Err(EquitasError::ValidationError(
                "instance weights sum to zero".to_string(),
            ));
        }

        let favorable = dataset.favorable_mask();
        let y: Vec<f64> = favorable.iter().map(|&f| if f { 1.0 } else { 0.0 }).collect();

        let privileged = self.descriptor.mask(dataset.inner(), true)?;
        let unprivileged = self.descriptor.mask(dataset.inner(), false)?;
        let privileged_mass = masked_weight_sum(weights, &privileged);
        let unprivileged_mass = masked_weight_sum(weights, &unprivileged);

        // Signed contribution of each instance to the parity constraint
        let direction: Vec<f64> = privileged
            .iter()
            .zip(&unprivileged)
            .map(|(&p, &u)| {
                if p {
                    1.0 / privileged_mass
                } else if u {
                    -1.0 / unprivileged_mass
                } else {
                    0.0
                }
            })
            .collect();

        let mut best: Option<Candidate<E>> = None;
        for multiplier in self.grid() {
            let costs: Vec<f64> = (0..y.len())
                .map(|i| {
                    weights[i] * ((1.0 - 2.0 * y[i]) / total + multiplier * direction[i])
                })
                .collect();
            let relabeled = Array1::from(
                costs
                    .iter()
                    .map(|&c| if c < 0.0 { 1.0 } else { 0.0 })
                    .collect::<Vec<f64>>(),
            );
            let magnitudes = Array1::from(costs.iter().map(|c| c.abs()).collect::<Vec<f64>>());
            if magnitudes.sum() <= 0.0 {
                debug!(multiplier, "skipping grid point with all-zero costs");
                continue;
            }

            let mut model = self.prototype.clone();
            model.fit(x, &relabeled, Some(&magnitudes))?;
            let raw = model.predict(x)?;
            let predicted: Vec<f64> = raw
                .iter()
                .map(|&v| if v >= 0.5 { 1.0 } else { 0.0 })
                .collect();

            let mut error = 0.0;
            let mut privileged_selected = 0.0;
            let mut unprivileged_selected = 0.0;
            for i in 0..y.len() {
                error += weights[i] * (predicted[i] - y[i]).abs();
                if privileged[i] {
                    privileged_selected += weights[i] * predicted[i];
                }
                if unprivileged[i] {
                    unprivileged_selected += weights[i] * predicted[i];
                }
            }
            error /= total;
            let violation = (unprivileged_selected / unprivileged_mass
                - privileged_selected / privileged_mass)
                .abs();
            debug!(multiplier, error, violation, "evaluated grid point");

            let candidate = Candidate {
                model,
                multiplier,
                error,
                violation,
            };
            best = Some(match best.take() {
                None => candidate,
                Some(current) => {
                    if prefer(&candidate, &current, self.constraint_bound) {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }

        let winner = best.ok_or_else(|| {
            EquitasError::ComputationError("no usable grid point produced a model".to_string())
        })?;
        if winner.violation > self.constraint_bound {
            warn!(
                violation = winner.violation,
                bound = self.constraint_bound,
                "no grid point satisfied the constraint; keeping the least-violating model"
            );
        }
        self.fitted = Some(winner);
        Ok(())
    }

    fn predict(&self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        let candidate = self
            .fitted
            .as_ref()
            .ok_or_else(|| EquitasError::NotFitted("GridSearchReduction".to_string()))?;
        let raw = candidate.model.predict(dataset.features())?;
        let favorable = dataset.favorable_label();
        let unfavorable = dataset.unfavorable_label();
        let labels = raw.mapv(|v| if v >= 0.5 { favorable } else { unfavorable });
        dataset.with_labels(labels)?.with_scores(raw)
    }
}

/// True when the challenger should replace the incumbent
fn prefer<E>(challenger: &Candidate<E>, incumbent: &Candidate<E>, bound: f64) -> bool {
    let challenger_ok = challenger.violation <= bound;
    let incumbent_ok = incumbent.violation <= bound;
    match (challenger_ok, incumbent_ok) {
        (true, true) => challenger.error < incumbent.error,
        (true, false) => true,
        (false, true) => false,
        (false, false) => challenger.violation < incumbent.violation,
    }
}
