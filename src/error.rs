//! Error types for shapelet search

use thiserror::Error;

/// Result type alias for shapelet search operations
pub type Result<T> = std::result::Result<T, ShapeletError>;

/// Main error type for the search subsystem
#[derive(Error, Debug)]
pub enum ShapeletError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Empty sampling range: series length {series_length} cannot hold a subsequence of length {length}")]
    EmptySamplingRange { series_length: usize, length: usize },

    #[error("Search not initialised: call initialise before searching series")]
    NotInitialised,

    #[error("Surrogate error: {0}")]
    SurrogateError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl ShapeletError {
    /// Shorthand for an [`ShapeletError::InvalidParameter`]
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ShapeletError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ShapeletError {
    fn from(err: serde_json::Error) -> Self {
        ShapeletError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ShapeletError {
    fn from(err: ndarray::ShapeError) -> Self {
        ShapeletError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
