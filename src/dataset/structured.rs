//! Core structured dataset container
//!
//! [`StructuredDataset`] owns the feature matrix, labels, scores, and
//! per-instance weights for one tabular dataset, together with the
//! declaration of its protected attributes. Instances are immutable by
//! convention: every transforming method returns a new, validated dataset
//! and never mutates one a caller already holds.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::values_equal;
use crate::error::{EquitasError, Result};

/// Declaration of one protected attribute: the column name plus which encoded
/// values count as privileged and which as unprivileged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedAttribute {
    /// Column name; must also be a feature column
    pub name: String,
    /// Encoded values that place an instance in the privileged group
    pub privileged_values: Vec<f64>,
    /// Encoded values that place an instance in the unprivileged group
    pub unprivileged_values: Vec<f64>,
}

impl ProtectedAttribute {
    /// Declare a protected attribute with its privileged and unprivileged values
    pub fn new(name: &str, privileged: &[f64], unprivileged: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            privileged_values: privileged.to_vec(),
            unprivileged_values: unprivileged.to_vec(),
        }
    }
}

/// Metadata for building a dataset from a `DataFrame`.
///
/// The provider names the label column and declares the protected attributes
/// explicitly; nothing is inferred from the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Name of the label column
    pub label_column: String,
    /// Protected-attribute declarations
    pub protected_attributes: Vec<ProtectedAttribute>,
    /// Optional per-instance weight column; weights default to 1.0 when absent
    pub weight_column: Option<String>,
    /// Optional score column; scores default to a copy of the labels
    pub score_column: Option<String>,
}

impl DatasetConfig {
    /// Create a config naming the label column
    pub fn new(label_column: &str) -> Self {
        Self {
            label_column: label_column.to_string(),
            protected_attributes: Vec::new(),
            weight_column: None,
            score_column: None,
        }
    }

    /// Declare a protected attribute
    pub fn with_protected_attribute(
        mut self,
        name: &str,
        privileged: &[f64],
        unprivileged: &[f64],
    ) -> Self {
        self.protected_attributes
            .push(ProtectedAttribute::new(name, privileged, unprivileged));
        self
    }

    /// Name the per-instance weight column
    pub fn with_weight_column(mut self, name: &str) -> Self {
        self.weight_column = Some(name.to_string());
        self
    }

    /// Name the score column
    pub fn with_score_column(mut self, name: &str) -> Self {
        self.score_column = Some(name.to_string());
        self
    }
}

/// Fairness-aware dataset: features, labels, scores, and per-instance weights
/// aligned by row, with protected-attribute bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDataset {
    feature_names: Vec<String>,
    features: Array2<f64>,
    label_name: String,
    labels: Array1<f64>,
    scores: Array1<f64>,
    weights: Array1<f64>,
    protected: Vec<ProtectedAttribute>,
}

impl StructuredDataset {
    /// Create a dataset with uniform weights and scores copied from the labels.
    ///
    /// Use [`StructuredDataset::builder`] when weights or scores are supplied
    /// by the provider.
    pub fn new(
        feature_names: &[&str],
        features: Array2<f64>,
        label_name: &str,
        labels: Array1<f64>,
        protected: Vec<ProtectedAttribute>,
    ) -> Result<Self> {
        let n = features.nrows();
        let scores = labels.clone();
        let dataset = Self {
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
            features,
            label_name: label_name.to_string(),
            labels,
            scores,
            weights: Array1::ones(n),
            protected,
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Start building a dataset piece by piece
    pub fn builder() -> StructuredDatasetBuilder {
        StructuredDatasetBuilder::default()
    }

    /// Build a dataset from an in-memory `DataFrame` plus explicit metadata.
    ///
    /// Integer and 32-bit float columns are cast to `f64`; other column types
    /// are rejected, so categorical encoding stays the provider's job. Every
    /// column except the label, weight, and score columns becomes a feature,
    /// in DataFrame order.
    pub fn from_dataframe(df: &DataFrame, config: &DatasetConfig) -> Result<Self> {
        let n = df.height();
        let mut feature_names: Vec<String> = Vec::new();
        let mut feature_columns: Vec<Vec<f64>> = Vec::new();
        let mut labels: Option<Vec<f64>> = None;
        let mut weights: Option<Vec<f64>> = None;
        let mut scores: Option<Vec<f64>> = None;

        for col in df.get_columns() {
            let name = col.name().as_str();
            let values = numeric_column(col)?;
            if name == config.label_column {
                labels = Some(values);
            } else if config.weight_column.as_deref() == Some(name) {
                weights = Some(values);
            } else if config.score_column.as_deref() == Some(name) {
                scores = Some(values);
            } else {
                feature_names.push(name.to_string());
                feature_columns.push(values);
            }
        }

        let labels = labels.ok_or_else(|| {
            EquitasError::DataError(format!("label column '{}' not found", config.label_column))
        })?;
        if let Some(name) = &config.weight_column {
            if weights.is_none() {
                return Err(EquitasError::DataError(format!(
                    "weight column '{}' not found",
                    name
                )));
            }
        }
        if let Some(name) = &config.score_column {
            if scores.is_none() {
                return Err(EquitasError::DataError(format!(
                    "score column '{}' not found",
                    name
                )));
            }
        }

        let mut features = Array2::zeros((n, feature_columns.len()));
        for (j, column) in feature_columns.iter().enumerate() {
            for (i, &value) in column.iter().enumerate() {
                features[[i, j]] = value;
            }
        }

        let labels = Array1::from_vec(labels);
        let scores = scores.map(Array1::from_vec).unwrap_or_else(|| labels.clone());
        let weights = weights.map(Array1::from_vec).unwrap_or_else(|| Array1::ones(n));

        let dataset = Self {
            feature_names,
            features,
            label_name: config.label_column.clone(),
            labels,
            scores,
            weights,
            protected: config.protected_attributes.clone(),
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Export the dataset as a `DataFrame` for reporting collaborators.
    ///
    /// Weights and scores follow the features and label as `instance_weight`
    /// and `score` columns.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.num_features() + 3);
        for (j, name) in self.feature_names.iter().enumerate() {
            columns.push(Column::new(
                name.as_str().into(),
                self.features.column(j).to_vec(),
            ));
        }
        columns.push(Column::new(
            self.label_name.as_str().into(),
            self.labels.to_vec(),
        ));
        columns.push(Column::new("instance_weight".into(), self.weights.to_vec()));
        columns.push(Column::new("score".into(), self.scores.to_vec()));
        Ok(DataFrame::new(columns)?)
    }

    /// Check every dataset invariant: aligned row counts, non-negative finite
    /// weights, protected attributes present as feature columns with disjoint
    /// value partitions covering every observed value.
    ///
    /// Constructors and copy-on-transform methods run this before returning,
    /// so a dataset in caller hands is always valid.
    pub fn validate(&self) -> Result<()> {
        let n = self.features.nrows();
        if self.feature_names.len() != self.features.ncols() {
            return Err(EquitasError::ValidationError(format!(
                "{} feature names for {} feature columns",
                self.feature_names.len(),
                self.features.ncols()
            )));
        }
        for (idx, name) in self.feature_names.iter().enumerate() {
            if self.feature_names[..idx].contains(name) {
                return Err(EquitasError::ValidationError(format!(
                    "duplicate feature column '{}'",
                    name
                )));
            }
        }
        if self.labels.len() != n {
            return Err(EquitasError::ValidationError(format!(
                "{} labels for {} instances",
                self.labels.len(),
                n
            )));
        }
        if self.scores.len() != n {
            return Err(EquitasError::ValidationError(format!(
                "{} scores for {} instances",
                self.scores.len(),
                n
            )));
        }
        if self.weights.len() != n {
            return Err(EquitasError::ValidationError(format!(
                "{} weights for {} instances",
                self.weights.len(),
                n
            )));
        }
        for (i, &w) in self.weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(EquitasError::ValidationError(format!(
                    "weight {} at row {} is negative or not finite",
                    w, i
                )));
            }
        }

        for attr in &self.protected {
            let column = match self.feature_index(&attr.name) {
                Some(idx) => self.features.column(idx),
                None => {
                    return Err(EquitasError::ValidationError(format!(
                        "protected attribute '{}' is not a feature column",
                        attr.name
                    )))
                }
            };
            if attr.privileged_values.is_empty() || attr.unprivileged_values.is_empty() {
                return Err(EquitasError::ValidationError(format!(
                    "protected attribute '{}' must declare at least one privileged \
                     and one unprivileged value",
                    attr.name
                )));
            }
            for pv in &attr.privileged_values {
                if attr.unprivileged_values.iter().any(|uv| values_equal(*pv, *uv)) {
                    return Err(EquitasError::ValidationError(format!(
                        "value {} of '{}' is declared both privileged and unprivileged",
                        pv, attr.name
                    )));
                }
            }
            for (i, &observed) in column.iter().enumerate() {
                let declared = attr
                    .privileged_values
                    .iter()
                    .chain(&attr.unprivileged_values)
                    .any(|v| values_equal(*v, observed));
                if !declared {
                    return Err(EquitasError::ValidationError(format!(
                        "value {} of '{}' at row {} is not declared privileged or unprivileged",
                        observed, attr.name, i
                    )));
                }
            }
        }

        Ok(())
    }

    /// Number of instances (rows)
    pub fn num_instances(&self) -> usize {
        self.features.nrows()
    }

    /// Number of feature columns
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// Sum of the instance weights
    pub fn weighted_num_instances(&self) -> f64 {
        self.weights.sum()
    }

    /// Feature column names, in matrix order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// The feature matrix (rows are instances)
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Name of the label column
    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    /// Label values, one per instance
    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    /// Score values, one per instance
    pub fn scores(&self) -> &Array1<f64> {
        &self.scores
    }

    /// Instance weights
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Protected-attribute declarations
    pub fn protected_attributes(&self) -> &[ProtectedAttribute] {
        &self.protected
    }

    fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|f| f == name)
    }

    /// Column view of any feature
    pub fn feature_column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        self.feature_index(name)
            .map(|idx| self.features.column(idx))
            .ok_or_else(|| EquitasError::DataError(format!("feature column '{}' not found", name)))
    }

    /// Column view of a protected attribute.
    ///
    /// Unlike `feature_column`, asking for a column that is not declared
    /// protected fails with [`EquitasError::UndefinedGroup`], since callers
    /// use this to resolve group membership.
    pub fn protected_column(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        if !self.protected.iter().any(|attr| attr.name == name) {
            return Err(EquitasError::UndefinedGroup(format!(
                "'{}' is not a protected attribute of this dataset",
                name
            )));
        }
        self.feature_column(name)
    }

    /// Check that `other` shares this dataset's row count and order.
    ///
    /// Row order is verified through the protected-attribute columns, which
    /// every transform leaves untouched. Labels, scores, weights, and
    /// non-protected features may differ; comparing those is the point of
    /// aligning two datasets in the first place.
    pub fn align(&self, other: &StructuredDataset) -> Result<()> {
        if self.num_instances() != other.num_instances() {
            return Err(EquitasError::AlignmentError(format!(
                "row counts differ: {} vs {}",
                self.num_instances(),
                other.num_instances()
            )));
        }
        if self.feature_names != other.feature_names {
            return Err(EquitasError::AlignmentError(
                "feature columns differ".to_string(),
            ));
        }
        if self.label_name != other.label_name {
            return Err(EquitasError::AlignmentError(format!(
                "label columns differ: '{}' vs '{}'",
                self.label_name, other.label_name
            )));
        }
        if self.protected != other.protected {
            return Err(EquitasError::AlignmentError(
                "protected-attribute declarations differ".to_string(),
            ));
        }
        for attr in &self.protected {
            let ours = self.protected_column(&attr.name)?;
            let theirs = other.protected_column(&attr.name)?;
            if ours
                .iter()
                .zip(theirs.iter())
                .any(|(a, b)| !values_equal(*a, *b))
            {
                return Err(EquitasError::AlignmentError(format!(
                    "protected attribute '{}' differs between datasets; rows are not aligned",
                    attr.name
                )));
            }
        }
        Ok(())
    }

    /// Partition rows into consecutive sub-datasets at the given fraction
    /// boundaries.
    ///
    /// Boundaries must be strictly increasing within (0, 1); `&[0.7]` yields a
    /// 70/30 split, `&[0.25, 0.5]` a 25/25/50 one. Without shuffling the parts
    /// concatenate back to the original row order exactly. Shuffling permutes
    /// rows first, deterministically for a given seed.
    pub fn split(
        &self,
        fractions: &[f64],
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<Vec<StructuredDataset>> {
        if fractions.is_empty() {
            return Err(EquitasError::InvalidParameter {
                name: "fractions".to_string(),
                value: "[]".to_string(),
                reason: "at least one boundary is required".to_string(),
            });
        }
        let mut previous = 0.0;
        for &f in fractions {
            if f <= previous || f >= 1.0 {
                return Err(EquitasError::InvalidParameter {
                    name: "fractions".to_string(),
                    value: format!("{:?}", fractions),
                    reason: "boundaries must be strictly increasing within (0, 1)".to_string(),
                });
            }
            previous = f;
        }

        let n = self.num_instances();
        let mut order: Vec<usize> = (0..n).collect();
        if shuffle {
            let mut rng = match seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            order.shuffle(&mut rng);
        }

        let mut boundaries: Vec<usize> = fractions.iter().map(|f| (f * n as f64) as usize).collect();
        boundaries.push(n);

        let mut parts = Vec::with_capacity(boundaries.len());
        let mut start = 0;
        for end in boundaries {
            parts.push(self.subset(&order[start..end])?);
            start = end;
        }
        Ok(parts)
    }

    /// Copy the selected rows into a new dataset
    pub fn subset(&self, indices: &[usize]) -> Result<StructuredDataset> {
        let n = self.num_instances();
        for &i in indices {
            if i >= n {
                return Err(EquitasError::ValidationError(format!(
                    "row index {} out of bounds for {} instances",
                    i, n
                )));
            }
        }
        let dataset = Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            label_name: self.label_name.clone(),
            labels: Array1::from_iter(indices.iter().map(|&i| self.labels[i])),
            scores: Array1::from_iter(indices.iter().map(|&i| self.scores[i])),
            weights: Array1::from_iter(indices.iter().map(|&i| self.weights[i])),
            protected: self.protected.clone(),
        };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Copy with new labels
    pub fn with_labels(&self, labels: Array1<f64>) -> Result<StructuredDataset> {
        let mut dataset = self.clone();
        dataset.labels = labels;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Copy with new scores
    pub fn with_scores(&self, scores: Array1<f64>) -> Result<StructuredDataset> {
        let mut dataset = self.clone();
        dataset.scores = scores;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Copy with new instance weights
    pub fn with_weights(&self, weights: Array1<f64>) -> Result<StructuredDataset> {
        let mut dataset = self.clone();
        dataset.weights = weights;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Copy with a new feature matrix of the same shape
    pub fn with_features(&self, features: Array2<f64>) -> Result<StructuredDataset> {
        let mut dataset = self.clone();
        dataset.features = features;
        dataset.validate()?;
        Ok(dataset)
    }
}

/// Builder assembling a [`StructuredDataset`] from matrices plus metadata;
/// `build()` validates every invariant.
#[derive(Debug, Default)]
pub struct StructuredDatasetBuilder {
    feature_names: Vec<String>,
    features: Option<Array2<f64>>,
    label_name: Option<String>,
    labels: Option<Array1<f64>>,
    scores: Option<Array1<f64>>,
    weights: Option<Array1<f64>>,
    protected: Vec<ProtectedAttribute>,
}

impl StructuredDatasetBuilder {
    /// Set the feature matrix and its column names
    pub fn with_features(mut self, names: &[&str], matrix: Array2<f64>) -> Self {
        self.feature_names = names.iter().map(|s| s.to_string()).collect();
        self.features = Some(matrix);
        self
    }

    /// Set the label column
    pub fn with_labels(mut self, name: &str, values: Array1<f64>) -> Self {
        self.label_name = Some(name.to_string());
        self.labels = Some(values);
        self
    }

    /// Set per-instance scores; defaults to a copy of the labels
    pub fn with_scores(mut self, values: Array1<f64>) -> Self {
        self.scores = Some(values);
        self
    }

    /// Set per-instance weights; defaults to uniform 1.0
    pub fn with_weights(mut self, values: Array1<f64>) -> Self {
        self.weights = Some(values);
        self
    }

    /// Declare a protected attribute
    pub fn with_protected_attribute(mut self, attr: ProtectedAttribute) -> Self {
        self.protected.push(attr);
        self
    }

    /// Validate and build the dataset
    pub fn build(self) -> Result<StructuredDataset> {
        let features = self.features.ok_or_else(|| {
            EquitasError::ValidationError("no feature matrix supplied".to_string())
        })?;
        let labels = self
            .labels
            .ok_or_else(|| EquitasError::ValidationError("no labels supplied".to_string()))?;
        let n = features.nrows();
        let dataset = StructuredDataset {
            feature_names: self.feature_names,
            features,
            label_name: self.label_name.unwrap_or_else(|| "label".to_string()),
            scores: self.scores.unwrap_or_else(|| labels.clone()),
            labels,
            weights: self.weights.unwrap_or_else(|| Array1::ones(n)),
            protected: self.protected,
        };
        dataset.validate()?;
        Ok(dataset)
    }
}

/// Extract a column as `f64` values, casting integer and `f32` columns
fn numeric_column(col: &Column) -> Result<Vec<f64>> {
    let name = col.name().as_str();
    let casted = match col.dtype() {
        DataType::Float64 => col.clone(),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32 => col.cast(&DataType::Float64)?,
        other => {
            return Err(EquitasError::DataError(format!(
                "column '{}' has non-numeric type {:?}; encode it before building a dataset",
                name, other
            )))
        }
    };
    let values = casted.f64()?;
    if values.null_count() > 0 {
        return Err(EquitasError::DataError(format!(
            "column '{}' contains {} null values",
            name,
            values.null_count()
        )));
    }
    Ok(values.into_no_null_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample_dataset() -> StructuredDataset {
        let features = array![
            [1.0, 30.0],
            [1.0, 45.0],
            [1.0, 50.0],
            [0.0, 25.0],
            [0.0, 60.0],
            [0.0, 35.0],
        ];
        StructuredDataset::new(
            &["sex", "income"],
            features,
            "hired",
            Array1::from(vec![1.0, 1.0, 0.0, 1.0, 0.0, 0.0]),
            vec![ProtectedAttribute::new("sex", &[1.0], &[0.0])],
        )
        .unwrap()
    }

    #[test]
    fn test_new_defaults() {
        let dataset = sample_dataset();
        assert_eq!(dataset.num_instances(), 6);
        assert_eq!(dataset.num_features(), 2);
        assert_eq!(dataset.weighted_num_instances(), 6.0);
        assert_eq!(dataset.scores(), dataset.labels());
    }

    #[test]
    fn test_builder_defaults_and_overrides() {
        let dataset = StructuredDataset::builder()
            .with_features(&["sex", "income"], array![[1.0, 10.0], [0.0, 20.0]])
            .with_labels("hired", Array1::from(vec![1.0, 0.0]))
            .with_weights(Array1::from(vec![2.0, 3.0]))
            .with_protected_attribute(ProtectedAttribute::new("sex", &[1.0], &[0.0]))
            .build()
            .unwrap();
        assert_eq!(dataset.weights().to_vec(), vec![2.0, 3.0]);
        assert_eq!(dataset.scores().to_vec(), vec![1.0, 0.0]);
        assert_eq!(dataset.label_name(), "hired");
    }

    #[test]
    fn test_validate_rejects_misaligned_labels() {
        let result = StructuredDataset::new(
            &["sex"],
            array![[1.0], [0.0]],
            "y",
            Array1::from(vec![1.0]),
            vec![ProtectedAttribute::new("sex", &[1.0], &[0.0])],
        );
        assert!(matches!(result, Err(EquitasError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let result = StructuredDataset::builder()
            .with_features(&["sex"], array![[1.0], [0.0]])
            .with_labels("y", Array1::from(vec![1.0, 0.0]))
            .with_weights(Array1::from(vec![1.0, -0.5]))
            .with_protected_attribute(ProtectedAttribute::new("sex", &[1.0], &[0.0]))
            .build();
        assert!(matches!(result, Err(EquitasError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_undeclared_protected_value() {
        let result = StructuredDataset::new(
            &["sex"],
            array![[1.0], [2.0]],
            "y",
            Array1::from(vec![1.0, 0.0]),
            vec![ProtectedAttribute::new("sex", &[1.0], &[0.0])],
        );
        assert!(matches!(result, Err(EquitasError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_protected_outside_features() {
        let result = StructuredDataset::new(
            &["income"],
            array![[10.0], [20.0]],
            "y",
            Array1::from(vec![1.0, 0.0]),
            vec![ProtectedAttribute::new("sex", &[1.0], &[0.0])],
        );
        assert!(matches!(result, Err(EquitasError::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_overlapping_declaration() {
        let result = StructuredDataset::new(
            &["sex"],
            array![[1.0], [0.0]],
            "y",
            Array1::from(vec![1.0, 0.0]),
            vec![ProtectedAttribute::new("sex", &[1.0, 0.0], &[0.0])],
        );
        assert!(matches!(result, Err(EquitasError::ValidationError(_))));
    }

    #[test]
    fn test_protected_column_rejects_plain_feature() {
        let dataset = sample_dataset();
        assert!(matches!(
            dataset.protected_column("income"),
            Err(EquitasError::UndefinedGroup(_))
        ));
        assert!(dataset.feature_column("income").is_ok());
    }

    #[test]
    fn test_split_round_trip() {
        let mut features =
            Array2::from_shape_vec((8, 2), (0..16).map(|v| v as f64).collect()).unwrap();
        for i in 0..8 {
            features[[i, 0]] = if i < 4 { 1.0 } else { 0.0 };
        }
        let dataset = StructuredDataset::new(
            &["sex", "income"],
            features,
            "y",
            Array1::from((0..8).map(|v| (v % 2) as f64).collect::<Vec<_>>()),
            vec![ProtectedAttribute::new("sex", &[1.0], &[0.0])],
        )
        .unwrap();

        let parts = dataset.split(&[0.25, 0.5], false, None).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts.iter().map(|p| p.num_instances()).collect::<Vec<_>>(),
            vec![2, 2, 4]
        );

        let labels: Vec<f64> = parts.iter().flat_map(|p| p.labels().to_vec()).collect();
        assert_eq!(labels, dataset.labels().to_vec());
        let incomes: Vec<f64> = parts
            .iter()
            .flat_map(|p| p.feature_column("income").unwrap().to_vec())
            .collect();
        assert_eq!(incomes, dataset.feature_column("income").unwrap().to_vec());
    }

    #[test]
    fn test_split_deterministic_given_seed() {
        let dataset = sample_dataset();
        let first = dataset.split(&[0.5], true, Some(42)).unwrap();
        let second = dataset.split(&[0.5], true, Some(42)).unwrap();
        assert_eq!(first[0], second[0]);
        assert_eq!(first[1], second[1]);
    }

    #[test]
    fn test_split_rejects_bad_fractions() {
        let dataset = sample_dataset();
        assert!(dataset.split(&[], false, None).is_err());
        assert!(dataset.split(&[0.0], false, None).is_err());
        assert!(dataset.split(&[1.0], false, None).is_err());
        assert!(dataset.split(&[0.7, 0.2], false, None).is_err());
    }

    #[test]
    fn test_subset_rejects_out_of_bounds() {
        let dataset = sample_dataset();
        assert!(matches!(
            dataset.subset(&[0, 6]),
            Err(EquitasError::ValidationError(_))
        ));
    }

    #[test]
    fn test_subset_selects_rows() {
        let dataset = sample_dataset();
        let subset = dataset.subset(&[1, 3]).unwrap();
        assert_eq!(subset.num_instances(), 2);
        assert_eq!(subset.labels().to_vec(), vec![1.0, 1.0]);
        assert_eq!(
            subset.feature_column("income").unwrap().to_vec(),
            vec![45.0, 25.0]
        );
    }

    #[test]
    fn test_align_rejects_row_count_mismatch() {
        let dataset = sample_dataset();
        let smaller = dataset.subset(&[0, 1, 2]).unwrap();
        assert!(matches!(
            dataset.align(&smaller),
            Err(EquitasError::AlignmentError(_))
        ));
    }

    #[test]
    fn test_align_rejects_reordered_rows() {
        let dataset = sample_dataset();
        let reordered = dataset.subset(&[3, 4, 5, 0, 1, 2]).unwrap();
        assert!(matches!(
            dataset.align(&reordered),
            Err(EquitasError::AlignmentError(_))
        ));
    }

    #[test]
    fn test_align_accepts_label_changes() {
        let dataset = sample_dataset();
        let relabeled = dataset
            .with_labels(Array1::from(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0]))
            .unwrap();
        assert!(dataset.align(&relabeled).is_ok());
    }

    #[test]
    fn test_with_weights_validates() {
        let dataset = sample_dataset();
        assert!(dataset.with_weights(Array1::from(vec![1.0, 1.0])).is_err());
        assert!(dataset
            .with_weights(Array1::from(vec![f64::NAN; 6]))
            .is_err());
        let reweighted = dataset
            .with_weights(Array1::from(vec![0.5, 1.0, 1.5, 2.0, 0.0, 1.0]))
            .unwrap();
        assert_eq!(reweighted.weighted_num_instances(), 6.0);
        // original untouched
        assert_eq!(dataset.weights().to_vec(), vec![1.0; 6]);
    }

    #[test]
    fn test_from_dataframe_and_back() {
        let df = df!(
            "sex" => &[1.0, 1.0, 0.0, 0.0],
            "income" => &[30.0, 45.0, 25.0, 60.0],
            "hired" => &[1.0, 0.0, 1.0, 0.0],
        )
        .unwrap();
        let config = DatasetConfig::new("hired").with_protected_attribute("sex", &[1.0], &[0.0]);
        let dataset = StructuredDataset::from_dataframe(&df, &config).unwrap();

        assert_eq!(dataset.num_instances(), 4);
        assert_eq!(dataset.feature_names(), &["sex", "income"]);
        assert_eq!(dataset.labels().to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(dataset.weights().to_vec(), vec![1.0; 4]);

        let exported = dataset.to_dataframe().unwrap();
        assert_eq!(exported.height(), 4);
        assert!(exported.column("instance_weight").is_ok());
        assert!(exported.column("score").is_ok());
    }

    #[test]
    fn test_from_dataframe_casts_integers() {
        let df = df!(
            "sex" => &[1i64, 0, 1, 0],
            "hired" => &[1i64, 0, 0, 1],
        )
        .unwrap();
        let config = DatasetConfig::new("hired").with_protected_attribute("sex", &[1.0], &[0.0]);
        let dataset = StructuredDataset::from_dataframe(&df, &config).unwrap();
        assert_eq!(dataset.labels().to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_from_dataframe_rejects_non_numeric() {
        let df = df!(
            "sex" => &[1.0, 0.0],
            "city" => &["nyc", "sf"],
            "hired" => &[1.0, 0.0],
        )
        .unwrap();
        let config = DatasetConfig::new("hired").with_protected_attribute("sex", &[1.0], &[0.0]);
        assert!(matches!(
            StructuredDataset::from_dataframe(&df, &config),
            Err(EquitasError::DataError(_))
        ));
    }

    #[test]
    fn test_from_dataframe_requires_label_column() {
        let df = df!("sex" => &[1.0, 0.0]).unwrap();
        let config = DatasetConfig::new("hired");
        assert!(matches!(
            StructuredDataset::from_dataframe(&df, &config),
            Err(EquitasError::DataError(_))
        ));
    }

    #[test]
    fn test_from_dataframe_weight_column() {
        let df = df!(
            "sex" => &[1.0, 0.0],
            "hired" => &[1.0, 0.0],
            "w" => &[2.0, 3.0],
        )
        .unwrap();
        let config = DatasetConfig::new("hired")
            .with_protected_attribute("sex", &[1.0], &[0.0])
            .with_weight_column("w");
        let dataset = StructuredDataset::from_dataframe(&df, &config).unwrap();
        assert_eq!(dataset.weights().to_vec(), vec![2.0, 3.0]);
        assert_eq!(dataset.feature_names(), &["sex"]);
    }
}
