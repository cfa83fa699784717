//! Forecaster capability and the built-in neural implementation.
//!
//! A [`Forecaster`] turns supervised `(window, label)` pairs into a trained
//! [`Model`]. Training is asynchronous: `fit` validates its inputs, starts
//! the work and hands back a [`TrainingRun`] that streams per-epoch
//! [`TrainingProgress`](crate::types::TrainingProgress) and finally yields
//! the model.
//!
//! ## Built-in architectures
//!
//! | Architecture | Layers |
//! |--------------|--------|
//! | `dense` | flatten → 32 ReLU → 16 ReLU → 1 |
//! | `linear` | flatten → 1 |
//! | `recurrent` | LSTM(32) over steps → 1 |

mod dense;
mod network;
mod neural;
mod optimizer;
mod recurrent;
mod run;

pub use dense::DenseNetwork;
pub use network::{NetworkModel, Trainable, DENSE_HIDDEN, RECURRENT_HIDDEN};
pub use neural::NeuralForecaster;
pub use optimizer::{clip_grad_norm, AdamOptimizer, MAX_GRAD_NORM};
pub use recurrent::RecurrentNetwork;
pub use run::TrainingRun;

use crate::error::{PipelineError, Result};
use crate::types::{Architecture, ForecasterConfig, Window};

/// A trained regressor from one window to one normalized target value.
pub trait Model: Send + Sync + std::fmt::Debug {
    /// Normalized prediction for `window`. Pure.
    fn predict(&self, window: &Window) -> f64;

    fn architecture(&self) -> Architecture;

    /// The serializable network, for models that have one.
    fn as_network(&self) -> Option<&NetworkModel> {
        None
    }
}

/// Produces trained models from supervised pairs.
pub trait Forecaster: Send + Sync {
    /// Start training on `windows`/`labels`.
    ///
    /// Fails with [`PipelineError::Training`] before any work starts when the
    /// pairs are empty or their counts differ.
    fn fit(
        &self,
        windows: Vec<Window>,
        labels: Vec<f64>,
        config: &ForecasterConfig,
    ) -> Result<TrainingRun>;
}

/// Input checks shared by forecasters.
pub fn check_pairs(windows: &[Window], labels: &[f64]) -> Result<()> {
    if windows.is_empty() {
        return Err(PipelineError::Training("no training pairs".to_string()));
    }
    if windows.len() != labels.len() {
        return Err(PipelineError::Training(format!(
            "{} windows but {} labels",
            windows.len(),
            labels.len()
        )));
    }
    let (steps, width) = (windows[0].len(), windows[0].num_features());
    if windows
        .iter()
        .any(|w| w.len() != steps || w.steps().iter().any(|s| s.len() != width))
    {
        return Err(PipelineError::Training(
            "windows differ in shape".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pairs() {
        let w = Window::new(vec![vec![1.0, 2.0]]);
        assert!(check_pairs(&[w.clone()], &[0.5]).is_ok());
        assert!(check_pairs(&[], &[]).is_err());
        assert!(check_pairs(&[w.clone()], &[]).is_err());

        let ragged = Window::new(vec![vec![1.0]]);
        assert!(check_pairs(&[w, ragged], &[0.0, 0.0]).is_err());
    }
}
