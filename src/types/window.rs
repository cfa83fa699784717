//! Model inputs: fixed-length windows of normalized feature vectors.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// `window_size` consecutive normalized feature vectors, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    steps: Vec<Vec<f64>>,
}

impl Window {
    pub fn new(steps: Vec<Vec<f64>>) -> Self {
        Self { steps }
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Width of each step (number of input features).
    pub fn num_features(&self) -> usize {
        self.steps.first().map_or(0, Vec::len)
    }

    pub fn steps(&self) -> &[Vec<f64>] {
        &self.steps
    }

    /// Row-major flattening: step 0 features, then step 1, ...
    pub fn flatten(&self) -> Vec<f64> {
        self.steps.iter().flatten().copied().collect()
    }
}

/// Supervised training pairs in ascending start-index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub windows: Vec<Window>,
    pub labels: Vec<f64>,
}

impl TrainingSet {
    pub fn new(windows: Vec<Window>, labels: Vec<f64>) -> Result<Self> {
        if windows.len() != labels.len() {
            return Err(PipelineError::Training(format!(
                "{} windows but {} labels",
                windows.len(),
                labels.len()
            )));
        }
        Ok(Self { windows, labels })
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Chronological split: the first `train_ratio` share trains, the rest
    /// validates. The training side keeps at least one pair.
    pub fn split(&self, train_ratio: f64) -> (Self, Self) {
        let cut = split_index(self.len(), train_ratio);
        (
            Self {
                windows: self.windows[..cut].to_vec(),
                labels: self.labels[..cut].to_vec(),
            },
            Self {
                windows: self.windows[cut..].to_vec(),
                labels: self.labels[cut..].to_vec(),
            },
        )
    }
}

/// Index where a chronological split at `train_ratio` cuts `len` pairs.
pub fn split_index(len: usize, train_ratio: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let ratio = train_ratio.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let cut = (len as f64 * ratio).floor() as usize;
    cut.clamp(1, len)
}
