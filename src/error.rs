//! Error types for the loanfund pipeline

use thiserror::Error;

/// Result type alias for loanfund operations
pub type Result<T> = std::result::Result<T, LoanfundError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum LoanfundError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Unparseable timestamp in {column}: {value:?}")]
    TimestampParse { column: String, value: String },

    #[error("Unseen category {value:?} in column {column}")]
    UnseenCategory { column: String, value: String },

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

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for LoanfundError {
    fn from(err: polars::error::PolarsError) -> Self {
        LoanfundError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for LoanfundError {
    fn from(err: serde_json::Error) -> Self {
        LoanfundError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for LoanfundError {
    fn from(err: ndarray::ShapeError) -> Self {
        LoanfundError::ShapeError {
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
        let err = LoanfundError::ColumnNotFound("SECTOR_NAME".to_string());
        assert_eq!(err.to_string(), "Column not found: SECTOR_NAME");

        let err = LoanfundError::TimestampParse {
            column: "POSTED_TIME".to_string(),
            value: "yesterday".to_string(),
        };
        assert_eq!(err.to_string(), "Unparseable timestamp in POSTED_TIME: \"yesterday\"");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LoanfundError = io_err.into();
        assert!(matches!(err, LoanfundError::IoError(_)));
    }
}
