//! Error types for house price training and serving

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, HousingError>;

/// Main error type
#[derive(Error, Debug)]
pub enum HousingError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Model unavailable at {path}: {reason}")]
    ModelUnavailable { path: String, reason: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Prediction failed: {status} {body}")]
    PredictionFailed { status: u16, body: String },

    #[error("Tensor error: {0}")]
    Tensor(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for HousingError {
    fn from(err: polars::error::PolarsError) -> Self {
        HousingError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HousingError {
    fn from(err: serde_json::Error) -> Self {
        HousingError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HousingError {
    fn from(err: ndarray::ShapeError) -> Self {
        HousingError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for HousingError {
    fn from(err: reqwest::Error) -> Self {
        HousingError::Http(err.to_string())
    }
}

impl From<image::ImageError> for HousingError {
    fn from(err: image::ImageError) -> Self {
        HousingError::Image(err.to_string())
    }
}
