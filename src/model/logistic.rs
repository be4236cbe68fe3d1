//! Weighted logistic regression

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{EquitasError, Result};
use crate::model::Estimator;

/// Logistic regression for binary classification, trained by batch gradient
/// descent with L2 regularization and optional per-sample weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// L2 regularization strength
    pub alpha: f64,
    /// Maximum gradient-descent iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Whether the model is fitted
    pub is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            is_fitted: false,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit with optional per-sample weights; `None` means uniform.
    pub fn fit_weighted(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(EquitasError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }
        let weights = match sample_weight {
            Some(w) => {
                if w.len() != n_samples {
                    return Err(EquitasError::ShapeError {
                        expected: format!("{} sample weights", n_samples),
                        actual: format!("{} sample weights", w.len()),
                    });
                }
                w.clone()
            }
            None => Array1::ones(n_samples),
        };
        let total = weights.sum();
        if total <= 0.0 {
            return Err(EquitasError::ValidationError(
                "sample weights sum to zero".to_string(),
            ));
        }

        let mut coef: Array1<f64> = Array1::zeros(n_features);
        let mut bias = 0.0;
        let lr = self.learning_rate;

        for _ in 0..self.max_iter {
            let linear = x.dot(&coef) + bias;
            let probs = Self::sigmoid(&linear);
            let errors = (&probs - y) * &weights;

            let dw = x.t().dot(&errors) / total + self.alpha * &coef;
            let db = errors.sum() / total;

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }
            coef = coef - lr * &dw;
            bias -= lr * db;
        }

        self.coefficients = Some(coef);
        self.intercept = Some(bias);
        self.is_fitted = true;
        Ok(self)
    }

    /// Predict favorable-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self
            .coefficients
            .as_ref()
            .ok_or_else(|| EquitasError::NotFitted("LogisticRegression".to_string()))?;
        if x.ncols() != coef.len() {
            return Err(EquitasError::ShapeError {
                expected: format!("{} features", coef.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let intercept = self.intercept.unwrap_or(0.0);
        let linear = x.dot(coef) + intercept;
        Ok(Self::sigmoid(&linear))
    }

    /// Predict 0/1 labels at the 0.5 probability threshold
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Unweighted accuracy against 0/1 targets
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        if predictions.len() != y.len() {
            return Err(EquitasError::ShapeError {
                expected: format!("{} targets", predictions.len()),
                actual: format!("{} targets", y.len()),
            });
        }
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (**p - **t).abs() < 0.5)
            .count();
        Ok(correct as f64 / y.len() as f64)
    }
}

impl Estimator for LogisticRegression {
    fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: Option<&Array1<f64>>,
    ) -> Result<()> {
        self.fit_weighted(x, y, sample_weight)?;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }
}
