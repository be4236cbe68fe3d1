//! Disparate impact remover (Feldman et al.)
//!
//! Rank-preserving within-group feature repair: each repairable column is
//! moved toward the per-quantile median across the two groups, interpolated
//! by `repair_level` in [0, 1]. Protected columns, labels, scores, and
//! weights pass through unchanged. The repaired values are computed once at
//! fit time from the fit dataset, and transforming assigns them into an
//! aligned input, so repeated transforms cannot compound the correction.

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithms::{require_group_mass, PreProcessor};
use crate::dataset::{BinaryLabelDataset, GroupDescriptor};
use crate::error::{EquitasError, Result};

/// Repaired feature matrix captured at fit time
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepairPlan {
    repaired: Array2<f64>,
    repaired_columns: Vec<usize>,
}

/// Pre-processing feature repairer removing group signal from non-protected
/// columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisparateImpactRemover {
    descriptor: GroupDescriptor,
    repair_level: f64,
    fitted: Option<RepairPlan>,
}

impl DisparateImpactRemover {
    /// Create an unfitted repairer with full repair strength
    pub fn new(descriptor: GroupDescriptor) -> Self {
        Self {
            descriptor,
            repair_level: 1.0,
            fitted: None,
        }
    }

    /// Set the repair strength: 0 leaves features unchanged, 1 fully
    /// equalizes the within-group distributions
    pub fn with_repair_level(mut self, level: f64) -> Self {
        self.repair_level = level.clamp(0.0, 1.0);
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}

impl PreProcessor for DisparateImpactRemover {
    fn fit(&mut self, dataset: &BinaryLabelDataset) -> Result<()> {
        self.descriptor.validate()?;
        require_group_mass(dataset, &self.descriptor)?;

        let privileged = self.descriptor.mask(dataset.inner(), true)?;
        let unprivileged = self.descriptor.mask(dataset.inner(), false)?;
        let membership: Vec<Option<bool>> = privileged
            .iter()
            .zip(&unprivileged)
            .map(|(&p, &u)| {
                if p {
                    Some(true)
                } else if u {
                    Some(false)
                } else {
                    None
                }
            })
            .collect();

        let protected: Vec<&str> = dataset
            .protected_attributes()
            .iter()
            .map(|attr| attr.name.as_str())
            .collect();
        let repaired_columns: Vec<usize> = dataset
            .feature_names()
            .iter()
            .enumerate()
            .filter(|(_, name)| !protected.contains(&name.as_str()))
            .map(|(j, _)| j)
            .collect();

        let features = dataset.features();
        let level = self.repair_level;
        let columns: Vec<(usize, Vec<f64>)> = repaired_columns
            .par_iter()
            .map(|&j| {
                let values = features.column(j).to_vec();
                (j, repair_column(&values, &membership, level))
            })
            .collect();

        let mut repaired = features.clone();
        for (j, column) in columns {
            for (i, value) in column.into_iter().enumerate() {
                repaired[[i, j]] = value;
            }
        }

        self.fitted = Some(RepairPlan {
            repaired,
            repaired_columns,
        });
        Ok(())
    }

    fn transform(&self, dataset: &BinaryLabelDataset) -> Result<BinaryLabelDataset> {
        let plan = self
            .fitted
            .as_ref()
            .ok_or_else(|| EquitasError::NotFitted("DisparateImpactRemover".to_string()))?;
        if dataset.num_instances() != plan.repaired.nrows()
            || dataset.num_features() != plan.repaired.ncols()
        {
            return Err(EquitasError::AlignmentError(format!(
                "dataset is {}x{} but the repair was fitted on {}x{}",
                dataset.num_instances(),
                dataset.num_features(),
                plan.repaired.nrows(),
                plan.repaired.ncols()
            )));
        }

        let mut features = dataset.features().clone();
        for &j in &plan.repaired_columns {
            features.column_mut(j).assign(&plan.repaired.column(j));
        }
        dataset.with_features(features)
    }
}

/// Repair one column: move every group member toward the cross-group median
/// of its within-group quantile. Rows outside both groups keep their values.
fn repair_column(values: &[f64], membership: &[Option<bool>], level: f64) -> Vec<f64> {
    let mut privileged_rows: Vec<usize> = Vec::new();
    let mut unprivileged_rows: Vec<usize> = Vec::new();
    for (i, side) in membership.iter().enumerate() {
        match side {
            Some(true) => privileged_rows.push(i),
            Some(false) => unprivileged_rows.push(i),
            None => {}
        }
    }

    let sorted_privileged = sorted_group_values(values, &privileged_rows);
    let sorted_unprivileged = sorted_group_values(values, &unprivileged_rows);

    let mut repaired = values.to_vec();
    for rows in [&privileged_rows, &unprivileged_rows] {
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            values[rows[a]]
                .partial_cmp(&values[rows[b]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (rank, &position) in order.iter().enumerate() {
            let row = rows[position];
            let q = if rows.len() > 1 {
                rank as f64 / (rows.len() - 1) as f64
            } else {
                0.5
            };
            let target = 0.5
                * (quantile_value(&sorted_privileged, q) + quantile_value(&sorted_unprivileged, q));
            repaired[row] = (1.0 - level) * values[row] + level * target;
        }
    }
    repaired
}

fn sorted_group_values(values: &[f64], rows: &[usize]) -> Vec<f64> {
    let mut out: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Nearest-rank quantile lookup on a non-empty sorted slice
fn quantile_value(sorted: &[f64], q: f64) -> f64 {
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx]
}
