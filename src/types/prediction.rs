//! Prediction requests and results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scorer;
use crate::types::Observation;

/// How the predictor chooses its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    /// Replay the last `k` real observations against their actual values.
    Historical,
    /// Forecast `k` steps past the end of the series from the trailing window.
    Future,
    /// One prediction from a caller-supplied observation.
    Custom,
}

impl PredictionMode {
    /// Title used by the presentation layer.
    pub fn title(&self) -> &'static str {
        match self {
            PredictionMode::Historical => "Historical Data Prediction",
            PredictionMode::Future => "Future Air Quality Forecast",
            PredictionMode::Custom => "Custom Input Prediction",
        }
    }
}

impl std::fmt::Display for PredictionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionMode::Historical => write!(f, "historical"),
            PredictionMode::Future => write!(f, "future"),
            PredictionMode::Custom => write!(f, "custom"),
        }
    }
}

/// Caller's choice of prediction mode and its argument.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    Historical { steps: usize },
    Future { steps: usize },
    Custom { input: Observation },
}

impl PredictionRequest {
    pub fn mode(&self) -> PredictionMode {
        match self {
            PredictionRequest::Historical { .. } => PredictionMode::Historical,
            PredictionRequest::Future { .. } => PredictionMode::Future,
            PredictionRequest::Custom { .. } => PredictionMode::Custom,
        }
    }
}

/// One denormalized prediction, with ground truth when it exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<f64>,
}

/// Ordered predictions for one target feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub mode: PredictionMode,
    pub target: String,
    pub points: Vec<PredictionPoint>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn predictions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted).collect()
    }

    /// Ground truth, only if every point carries one.
    pub fn actuals(&self) -> Option<Vec<f64>> {
        self.points.iter().map(|p| p.actual).collect()
    }

    /// Error metrics against ground truth; `None` when there is none.
    pub fn score(&self) -> Option<Result<Metrics>> {
        let actuals = self.actuals()?;
        if actuals.is_empty() {
            return None;
        }
        Some(scorer::score(&self.predictions(), &actuals))
    }

    pub fn summary(&self) -> Option<PredictionSummary> {
        scorer::summarize(&self.predictions())
    }
}

/// Error metrics between predictions and ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mse: f64,
    pub mae: f64,
    pub rmse: f64,
}

/// Mean / min / max of a prediction run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Held-out evaluation recorded after training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Number of held-out pairs scored.
    pub samples: usize,
    /// MSE in normalized units.
    pub mse: f64,
    /// MAE in normalized units.
    pub mae: f64,
    /// RMSE in normalized units.
    pub rmse: f64,
    /// MAE scaled back to the target's units.
    pub denormalized_mae: f64,
}
