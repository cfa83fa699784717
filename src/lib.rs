//! airq: Air-Quality Time-Series Forecasting
//!
//! Loads a dated air-quality series, z-score normalizes it, windows it into
//! supervised pairs, trains a small neural regressor and predicts in three
//! modes (historical replay, future forecast, custom input).
//!
//! ## Architecture
//!
//! - **Normalizer**: per-feature mean / population std, apply and inverse
//! - **Windower**: `(window, label)` pairs and the trailing window
//! - **Forecaster**: `Forecaster` / `Model` traits, built-in `NeuralForecaster`
//! - **Predictor**: historical / future / custom prediction modes
//! - **Scorer**: MSE, MAE, RMSE
//! - **Pipeline**: owns the series and the single trained model
//! - **Persistence**: key/value snapshots (in-memory or sled)

pub mod config;
pub mod error;
pub mod forecaster;
pub mod normalizer;
pub mod persistence;
pub mod pipeline;
pub mod predictor;
pub mod sample;
pub mod scorer;
pub mod types;
pub mod windower;

// Re-export configuration
pub use config::AirqConfig;

pub use error::{PipelineError, Result};

// Re-export commonly used types
pub use types::{
    AqiCategory, Architecture, Evaluation, FeatureStat, FeatureStats, ForecasterConfig, Metrics,
    Observation, PredictionMode, PredictionPoint, PredictionRequest, PredictionResult, Series,
    TrainingProgress, TrainingSet, Window,
};

// Re-export forecaster and pipeline entry points
pub use forecaster::{Forecaster, Model, NetworkModel, NeuralForecaster, TrainingRun};
pub use pipeline::{PipelineState, TrainedPipeline, TrainingRequest, TrainingSession};

// Re-export storage
pub use persistence::{InMemoryStore, KeyValueStore, SledStore};
