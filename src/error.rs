//! Error types for the equitas fairness framework

use thiserror::Error;

/// Result type alias for equitas operations
pub type Result<T> = std::result::Result<T, EquitasError>;

/// Main error type for the equitas framework
#[derive(Error, Debug)]
pub enum EquitasError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Alignment error: {0}")]
    AlignmentError(String),

    #[error("Undefined group: {0}")]
    UndefinedGroup(String),

    #[error("Empty group: {0}")]
    EmptyGroup(String),

    #[error("Insufficient group data: {0}")]
    InsufficientGroupData(String),

    #[error("{0} has not been fitted")]
    NotFitted(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<polars::error::PolarsError> for EquitasError {
    fn from(err: polars::error::PolarsError) -> Self {
        EquitasError::DataError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EquitasError {
    fn from(err: ndarray::ShapeError) -> Self {
        EquitasError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EquitasError::EmptyGroup("privileged group has zero weight".to_string());
        assert_eq!(
            err.to_string(),
            "Empty group: privileged group has zero weight"
        );
    }

    #[test]
    fn test_not_fitted_display() {
        let err = EquitasError::NotFitted("Reweighing".to_string());
        assert_eq!(err.to_string(), "Reweighing has not been fitted");
    }

    #[test]
    fn test_shape_error_display() {
        let err = EquitasError::ShapeError {
            expected: "4 rows".to_string(),
            actual: "3 rows".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid shape: expected 4 rows, got 3 rows");
    }
}
