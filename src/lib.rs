//! Equitas - Fairness auditing and bias mitigation for tabular ML
//!
//! This crate provides a complete fairness toolkit including:
//! - Structured datasets with protected attributes and instance weights
//! - Group fairness metrics over datasets and classifier predictions
//! - Bias mitigation before, during, and after model training
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Structured and binary-label datasets, group descriptors
//!
//! ## Auditing
//! - [`metrics`] - Dataset-level and classification fairness metrics
//!
//! ## Mitigation
//! - [`algorithms`] - Pre-, in-, and post-processing bias mitigation
//!
//! ## Modeling
//! - [`model`] - Estimator trait and a weighted logistic baseline

// Core error handling
pub mod error;

// Data layer
pub mod dataset;

// Fairness auditing
pub mod metrics;

// Modeling
pub mod model;

// Bias mitigation
pub mod algorithms;

pub use error::{EquitasError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{EquitasError, Result};

    // Datasets
    pub use crate::dataset::{
        BinaryLabelDataset, DatasetConfig, GroupDescriptor, ProtectedAttribute,
        StructuredDataset, StructuredDatasetBuilder,
    };

    // Metrics
    pub use crate::metrics::{
        BinaryLabelDatasetMetric, ClassificationMetric, ConfusionMatrix, PerformanceMeasures,
    };

    // Modeling
    pub use crate::model::{Estimator, LogisticRegression};

    // Mitigation
    pub use crate::algorithms::{
        CalibratedEqOddsPostprocessing, CostConstraint, DisparateImpactRemover,
        FairnessCriterion, GridSearchReduction, InProcessor, PostProcessor, PreProcessor,
        PrejudiceRemover, RejectOptionClassification, Reweighing,
    };
}
