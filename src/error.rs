//! Error types for the stackcast trainer

use thiserror::Error;

/// Result type alias for stackcast operations
pub type Result<T> = std::result::Result<T, StackcastError>;

/// Main error type for the stackcast trainer
#[derive(Error, Debug)]
pub enum StackcastError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<polars::error::PolarsError> for StackcastError {
    fn from(err: polars::error::PolarsError) -> Self {
        StackcastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for StackcastError {
    fn from(err: serde_json::Error) -> Self {
        StackcastError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for StackcastError {
    fn from(err: bincode::Error) -> Self {
        StackcastError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for StackcastError {
    fn from(err: ndarray::ShapeError) -> Self {
        StackcastError::ShapeError {
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
        let err = StackcastError::DataError("bad column".to_string());
        assert_eq!(err.to_string(), "Data error: bad column");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StackcastError = io_err.into();
        assert!(matches!(err, StackcastError::IoError(_)));
    }
}
