//! Pipeline error type.
//!
//! Every failure is a local validation failure surfaced to the caller with
//! enough context (feature name, required vs. available length) to build a
//! corrective message. Nothing is retried.

use thiserror::Error;

/// Errors produced by the forecasting pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Statistics were requested over an empty series.
    #[error("Empty input: cannot compute statistics over an empty series")]
    EmptyInput,

    /// The series is too short for the requested window / horizon.
    #[error("Insufficient data: need {needed} observations, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The forecaster rejected its inputs or the training run failed.
    #[error("Training error: {0}")]
    Training(String),

    /// Normalization statistics are missing for a feature.
    #[error("Missing statistics for feature '{feature}'")]
    MissingStats { feature: String },

    /// An observation lacks a value for a required feature.
    #[error("Missing value for feature '{feature}'")]
    MissingFeature { feature: String },

    /// A prediction was requested before any model was trained or loaded.
    #[error("No trained model: run training first")]
    NoModel,

    /// Predictions and ground truth differ in length.
    #[error("Length mismatch: {predictions} predictions vs {actuals} actual values")]
    LengthMismatch { predictions: usize, actuals: usize },

    /// An ingested record could not be turned into an observation.
    #[error("Invalid record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// A request or configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A persisted snapshot could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key/value backend failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for PipelineError {
    fn from(err: sled::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, PipelineError>;
