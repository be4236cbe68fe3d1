//! Estimator capability
//!
//! In-processing algorithms drive classifiers through the [`Estimator`]
//! trait: fit on a feature matrix with optional per-sample weights, predict
//! hard labels. One concrete implementation ships, a weighted logistic
//! regression; anything else that can fit and predict plugs in the same way.

mod logistic;

pub use logistic::LogisticRegression;

use ndarray::{Array1, Array2};

use crate::error::Result;

/// Fit/predict capability for binary classifiers.
///
/// Targets are 1.0/0.0 indicators. `sample_weight` follows the usual
/// convention: `None` means uniform weights. Implementations must reject
/// shape mismatches rather than truncating.
pub trait Estimator: Send + Sync {
    /// Fit on features and 0/1 targets
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()>;

    /// Predict a 0/1 label for each row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}
