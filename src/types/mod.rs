//! Shared data structures for the forecasting pipeline
//!
//! - `series`: Observation / Series (ingested, chronologically ordered data)
//! - `stats`: FeatureStats (z-score mean/std per feature)
//! - `window`: Window / TrainingSet (model inputs and supervised pairs)
//! - `training`: ForecasterConfig, Architecture, TrainingProgress
//! - `prediction`: PredictionRequest / PredictionResult, Metrics, Evaluation
//! - `air_quality`: feature units and AQI bands

mod series;
mod stats;
mod window;
mod training;
mod prediction;
mod air_quality;

pub use series::*;
pub use stats::*;
pub use window::*;
pub use training::*;
pub use prediction::*;
pub use air_quality::*;
