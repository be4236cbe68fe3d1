//! Single-dataset bias audit

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};
use crate::metrics::{group_label, indicator, joint_weight_sum, masked_weight_sum};

/// Group-conditioned statistics over one binary-label dataset.
///
/// The group descriptor is engine context, not dataset state: auditing the
/// same dataset under a different group definition just means constructing a
/// new engine. Construction validates the descriptor against the dataset, so
/// every later call can assume well-defined groups.
///
/// Group-conditioned methods take `Option<bool>`: `Some(true)` restricts to
/// the privileged group, `Some(false)` to the unprivileged one, and `None`
/// covers the whole dataset.
pub struct BinaryLabelDatasetMetric<'a> {
    dataset: &'a BinaryLabelDataset,
    descriptor: GroupDescriptor,
}

impl<'a> BinaryLabelDatasetMetric<'a> {
    /// Create an engine for the dataset under the given group definition
    pub fn new(dataset: &'a BinaryLabelDataset, descriptor: GroupDescriptor) -> Result<Self> {
        descriptor.validate()?;
        descriptor.mask(dataset.inner(), true)?;
        descriptor.mask(dataset.inner(), false)?;
        Ok(Self {
            dataset,
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

    /// Weighted instance count, optionally restricted to one group
    pub fn num_instances(&self, privileged: Option<bool>) -> Result<f64> {
        let mask = self.condition_mask(privileged)?;
        Ok(masked_weight_sum(self.dataset.weights(), &mask))
    }

    /// Weighted count of favorable-labeled instances
    pub fn num_positives(&self, privileged: Option<bool>) -> Result<f64> {
        let mask = self.condition_mask(privileged)?;
        Ok(joint_weight_sum(
            self.dataset.weights(),
            &mask,
            &self.dataset.favorable_mask(),
        ))
    }

    /// Weighted count of unfavorable-labeled instances
    pub fn num_negatives(&self, privileged: Option<bool>) -> Result<f64> {
        let mask = self.condition_mask(privileged)?;
        let unfavorable: Vec<bool> = self.dataset.favorable_mask().iter().map(|&f| !f).collect();
        Ok(joint_weight_sum(self.dataset.weights(), &mask, &unfavorable))
    }

    /// Weighted fraction of favorable outcomes.
    ///
    /// Fails with [`EquitasError::EmptyGroup`] when the selected rows carry
    /// zero total weight; a rate over nothing has no value worth returning.
    pub fn base_rate(&self, privileged: Option<bool>) -> Result<f64> {
        let mask = self.condition_mask(privileged)?;
        let total = masked_weight_sum(self.dataset.weights(), &mask);
        if total == 0.0 {
            return Err(EquitasError::EmptyGroup(format!(
                "{} has zero weighted mass",
                group_label(privileged)
            )));
        }
        let favorable = joint_weight_sum(
            self.dataset.weights(),
            &mask,
            &self.dataset.favorable_mask(),
        );
        Ok(favorable / total)
    }

    /// Unprivileged base rate minus privileged base rate
    pub fn statistical_parity_difference(&self) -> Result<f64> {
        Ok(self.base_rate(Some(false))? - self.base_rate(Some(true))?)
    }

    /// Alias for [`statistical_parity_difference`](Self::statistical_parity_difference)
    pub fn mean_difference(&self) -> Result<f64> {
        self.statistical_parity_difference()
    }

    /// Ratio of unprivileged to privileged base rate.
    ///
    /// A privileged base rate of zero makes the ratio undefined and fails;
    /// an unprivileged rate of zero simply yields 0.0.
    pub fn disparate_impact(&self) -> Result<f64> {
        let unprivileged = self.base_rate(Some(false))?;
        let privileged = self.base_rate(Some(true))?;
        if privileged == 0.0 {
            return Err(EquitasError::EmptyGroup(
                "privileged base rate is zero, disparate impact is undefined".to_string(),
            ));
        }
        Ok(unprivileged / privileged)
    }

    /// Individual-fairness consistency: one minus the mean deviation of each
    /// outcome from the mean outcome of its `n_neighbors` nearest neighbors
    /// by Euclidean distance over the features. Neighborhoods include the
    /// instance itself. 1.0 means every instance agrees with its neighbors.
    pub fn consistency(&self, n_neighbors: usize) -> Result<f64> {
        let n = self.dataset.num_instances();
        if n == 0 {
            return Err(EquitasError::EmptyGroup(
                "dataset has no instances".to_string(),
            ));
        }
        if n_neighbors == 0 {
            return Err(EquitasError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "at least one neighbor is required".to_string(),
            });
        }
        let k = n_neighbors.min(n);
        let features = self.dataset.features();
        let outcome = indicator(&self.dataset.favorable_mask());

        let total: f64 = (0..n)
            .into_par_iter()
            .map(|i| {
                let row = features.row(i);
                let neighbors = k_nearest(features, &row, k);
                let mean =
                    neighbors.iter().map(|&j| outcome[j]).sum::<f64>() / neighbors.len() as f64;
                (outcome[i] - mean).abs()
            })
            .sum();

        Ok(1.0 - total / n as f64)
    }
}

/// Max-heap entry keeping the k smallest distances
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for DistIdx {}

impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

fn k_nearest(features: &Array2<f64>, row: &ArrayView1<'_, f64>, k: usize) -> Vec<usize> {
    let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
    for (j, other) in features.rows().into_iter().enumerate() {
        let dist = row
            .iter()
            .zip(other.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>();
        if heap.len() < k {
            heap.push(DistIdx(dist, j));
        } else if let Some(&DistIdx(worst, _)) = heap.peek() {
            if dist < worst {
                heap.pop();
                heap.push(DistIdx(dist, j));
            }
        }
    }
    heap.into_iter().map(|DistIdx(_, j)| j).collect()
}
