//! Forecaster configuration and training progress events.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Network family used by the built-in forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Two ReLU hidden layers (32, 16) and a linear output.
    #[default]
    Dense,
    /// A single affine unit.
    Linear,
    /// LSTM over the window steps followed by a linear output.
    Recurrent,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Dense => "dense",
            Architecture::Linear => "linear",
            Architecture::Recurrent => "recurrent",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Architecture {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(Architecture::Dense),
            "linear" => Ok(Architecture::Linear),
            "recurrent" | "lstm" => Ok(Architecture::Recurrent),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown architecture '{other}' (expected dense, linear or recurrent)"
            ))),
        }
    }
}

/// Hyperparameters handed to a [`Forecaster`](crate::forecaster::Forecaster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecasterConfig {
    pub architecture: Architecture,
    pub epochs: usize,
    pub batch_size: usize,
    /// Adam step size.
    pub learning_rate: f64,
    /// Trailing share of training pairs held out for validation loss.
    pub validation_split: f64,
    /// Seed for weight initialization and batch shuffling.
    pub seed: u64,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::Dense,
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            validation_split: 0.2,
            seed: 42,
        }
    }
}

/// Upper bound on `ForecasterConfig::epochs`.
pub const MAX_EPOCHS: usize = 100_000;

impl ForecasterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(PipelineError::InvalidConfig("epochs must be > 0".to_string()));
        }
        if self.epochs > MAX_EPOCHS {
            return Err(PipelineError::InvalidConfig(format!(
                "epochs must be <= {MAX_EPOCHS}, got {}",
                self.epochs
            )));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig("batch_size must be > 0".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(PipelineError::InvalidConfig(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        Ok(())
    }

    /// Share of pairs used for fitting.
    pub fn train_ratio(&self) -> f64 {
        1.0 - self.validation_split
    }
}

/// One epoch's losses, in normalized units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean squared error over the training pairs.
    pub training_loss: f64,
    /// Mean squared error over the held-out pairs, if any were held out.
    pub validation_loss: Option<f64>,
    pub training_mae: f64,
    pub validation_mae: Option<f64>,
}
