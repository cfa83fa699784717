//! Prediction error metrics.

use crate::error::{PipelineError, Result};
use crate::types::{Metrics, PredictionSummary};

fn check_lengths(predictions: &[f64], actuals: &[f64]) -> Result<()> {
    if predictions.len() != actuals.len() {
        return Err(PipelineError::LengthMismatch {
            predictions: predictions.len(),
            actuals: actuals.len(),
        });
    }
    Ok(())
}

/// Mean squared error. Empty inputs score 0.
pub fn mse(predictions: &[f64], actuals: &[f64]) -> Result<f64> {
    check_lengths(predictions, actuals)?;
    if predictions.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = predictions
        .iter()
        .zip(actuals)
        .map(|(p, a)| (p - a).powi(2))
        .sum();
    Ok(sum / predictions.len() as f64)
}

/// Mean absolute error. Empty inputs score 0.
pub fn mae(predictions: &[f64], actuals: &[f64]) -> Result<f64> {
    check_lengths(predictions, actuals)?;
    if predictions.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = predictions.iter().zip(actuals).map(|(p, a)| (p - a).abs()).sum();
    Ok(sum / predictions.len() as f64)
}

/// Root mean squared error.
pub fn rmse(predictions: &[f64], actuals: &[f64]) -> Result<f64> {
    Ok(mse(predictions, actuals)?.sqrt())
}

/// All three metrics at once.
pub fn score(predictions: &[f64], actuals: &[f64]) -> Result<Metrics> {
    let mse = mse(predictions, actuals)?;
    Ok(Metrics {
        mse,
        mae: mae(predictions, actuals)?,
        rmse: mse.sqrt(),
    })
}

/// Mean, min and max of a prediction run; `None` when empty.
pub fn summarize(values: &[f64]) -> Option<PredictionSummary> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some(PredictionSummary { mean, min, max })
}
