//! Binary-label dataset specialization

use ndarray::{Array1, Array2, ArrayView1};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::dataset::{values_equal, DatasetConfig, ProtectedAttribute, StructuredDataset};
use crate::error::{EquitasError, Result};

/// A structured dataset whose label column takes exactly two values, one of
/// which is declared favorable.
///
/// Wraps a [`StructuredDataset`] rather than extending it: row access goes
/// through the inner dataset, and the wrapper adds the favorable/unfavorable
/// outcome semantics on top. Rate computations downstream are defined over
/// [`BinaryLabelDataset::favorable_mask`], never over raw label values, so
/// any two-value encoding works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryLabelDataset {
    dataset: StructuredDataset,
    favorable_label: f64,
    unfavorable_label: f64,
}

impl BinaryLabelDataset {
    /// Wrap a structured dataset, declaring which label value is favorable.
    ///
    /// Fails if the two declared values coincide or if any label is neither
    /// of them.
    pub fn new(
        dataset: StructuredDataset,
        favorable_label: f64,
        unfavorable_label: f64,
    ) -> Result<Self> {
        if values_equal(favorable_label, unfavorable_label) {
            return Err(EquitasError::ValidationError(format!(
                "favorable and unfavorable labels are both {}",
                favorable_label
            )));
        }
        for (i, &label) in dataset.labels().iter().enumerate() {
            if !values_equal(label, favorable_label) && !values_equal(label, unfavorable_label) {
                return Err(EquitasError::ValidationError(format!(
                    "label {} at row {} is neither the favorable ({}) nor the unfavorable ({}) value",
                    label, i, favorable_label, unfavorable_label
                )));
            }
        }
        Ok(Self {
            dataset,
            favorable_label,
            unfavorable_label,
        })
    }

    /// Build from a `DataFrame` in one step
    pub fn from_dataframe(
        df: &DataFrame,
        config: &DatasetConfig,
        favorable_label: f64,
        unfavorable_label: f64,
    ) -> Result<Self> {
        Self::new(
            StructuredDataset::from_dataframe(df, config)?,
            favorable_label,
            unfavorable_label,
        )
    }

    /// The wrapped structured dataset
    pub fn inner(&self) -> &StructuredDataset {
        &self.dataset
    }

    /// The label value declared favorable
    pub fn favorable_label(&self) -> f64 {
        self.favorable_label
    }

    /// The label value declared unfavorable
    pub fn unfavorable_label(&self) -> f64 {
        self.unfavorable_label
    }

    /// Boolean mask, true where the label is the favorable value
    pub fn favorable_mask(&self) -> Vec<bool> {
        self.dataset
            .labels()
            .iter()
            .map(|&label| values_equal(label, self.favorable_label))
            .collect()
    }

    pub fn num_instances(&self) -> usize {
        self.dataset.num_instances()
    }

    pub fn num_features(&self) -> usize {
        self.dataset.num_features()
    }

    pub fn weighted_num_instances(&self) -> f64 {
        self.dataset.weighted_num_instances()
    }

    pub fn features(&self) -> &Array2<f64> {
        self.dataset.features()
    }

    pub fn feature_names(&self) -> &[String] {
        self.dataset.feature_names()
    }

    pub fn labels(&self) -> &Array1<f64> {
        self.dataset.labels()
    }

    pub fn scores(&self) -> &Array1<f64> {
        self.dataset.scores()
    }

    pub fn weights(&self) -> &Array1<f64> {
        self.dataset.weights()
    }

    pub fn protected_attributes(&self) -> &[ProtectedAttribute] {
        self.dataset.protected_attributes()
    }

    pub fn protected_column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        self.dataset.protected_column(name)
    }

    /// Copy with new labels; the binary-label invariant is revalidated
    pub fn with_labels(&self, labels: Array1<f64>) -> Result<Self> {
        Self::new(
            self.dataset.with_labels(labels)?,
            self.favorable_label,
            self.unfavorable_label,
        )
    }

    /// Copy with new scores
    pub fn with_scores(&self, scores: Array1<f64>) -> Result<Self> {
        Self::new(
            self.dataset.with_scores(scores)?,
            self.favorable_label,
            self.unfavorable_label,
        )
    }

    /// Copy with new instance weights
    pub fn with_weights(&self, weights: Array1<f64>) -> Result<Self> {
        Self::new(
            self.dataset.with_weights(weights)?,
            self.favorable_label,
            self.unfavorable_label,
        )
    }

    /// Copy with a new feature matrix of the same shape
    pub fn with_features(&self, features: Array2<f64>) -> Result<Self> {
        Self::new(
            self.dataset.with_features(features)?,
            self.favorable_label,
            self.unfavorable_label,
        )
    }

    /// Alignment check covering the inner dataset plus the label declaration
    pub fn align(&self, other: &BinaryLabelDataset) -> Result<()> {
        if !values_equal(self.favorable_label, other.favorable_label)
            || !values_equal(self.unfavorable_label, other.unfavorable_label)
        {
            return Err(EquitasError::AlignmentError(
                "favorable/unfavorable label declarations differ".to_string(),
            ));
        }
        self.dataset.align(other.inner())
    }

    /// Partition rows at fraction boundaries; see [`StructuredDataset::split`]
    pub fn split(&self, fractions: &[f64], shuffle: bool, seed: Option<u64>) -> Result<Vec<Self>> {
        self.dataset
            .split(fractions, shuffle, seed)?
            .into_iter()
            .map(|part| Self::new(part, self.favorable_label, self.unfavorable_label))
            .collect()
    }

    /// Copy the selected rows into a new dataset
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        Self::new(
            self.dataset.subset(indices)?,
            self.favorable_label,
            self.unfavorable_label,
        )
    }
}
