//! Trainable networks behind the built-in forecaster.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dense::DenseNetwork;
use super::recurrent::RecurrentNetwork;
use super::Model;
use crate::types::{Architecture, Window};

/// Hidden layer widths of the dense architecture.
pub const DENSE_HIDDEN: [usize; 2] = [32, 16];

/// LSTM state width of the recurrent architecture.
pub const RECURRENT_HIDDEN: usize = 32;

/// A network with a flat parameter vector and an analytic gradient.
pub trait Trainable {
    fn params(&self) -> &[f64];
    fn params_mut(&mut self) -> &mut [f64];

    /// Prediction for one window.
    fn forward(&self, window: &Window) -> f64;

    /// Add `scale * d/dθ (prediction - label)²` into `grad` and return the
    /// prediction.
    fn accumulate_gradient(&self, window: &Window, label: f64, scale: f64, grad: &mut [f64]) -> f64;
}

/// Glorot-uniform samples for a `fan_in -> fan_out` layer.
pub fn glorot_uniform<R: Rng>(rng: &mut R, fan_in: usize, fan_out: usize, n: usize) -> Vec<f64> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
    (0..n).map(|_| rng.gen::<f64>() * 2.0 * limit - limit).collect()
}

/// Serializable trained network, one variant per [`Architecture`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "architecture", rename_all = "lowercase")]
pub enum NetworkModel {
    Dense(DenseNetwork),
    Linear(DenseNetwork),
    Recurrent(RecurrentNetwork),
}

impl NetworkModel {
    /// Freshly initialized network for windows of `window_size` steps with
    /// `num_features` values each.
    pub fn new<R: Rng>(
        architecture: Architecture,
        window_size: usize,
        num_features: usize,
        rng: &mut R,
    ) -> Self {
        match architecture {
            Architecture::Dense => {
                NetworkModel::Dense(DenseNetwork::new(window_size * num_features, &DENSE_HIDDEN, rng))
            }
            Architecture::Linear => {
                NetworkModel::Linear(DenseNetwork::new(window_size * num_features, &[], rng))
            }
            Architecture::Recurrent => {
                NetworkModel::Recurrent(RecurrentNetwork::new(num_features, RECURRENT_HIDDEN, rng))
            }
        }
    }

    fn inner(&self) -> &dyn Trainable {
        match self {
            NetworkModel::Dense(net) | NetworkModel::Linear(net) => net,
            NetworkModel::Recurrent(net) => net,
        }
    }

    /// Whether this network can consume windows of the given shape.
    pub fn accepts(&self, window_size: usize, num_features: usize) -> bool {
        match self {
            NetworkModel::Dense(net) | NetworkModel::Linear(net) => {
                net.is_consistent() && net.input_size() == window_size * num_features
            }
            NetworkModel::Recurrent(net) => net.is_consistent() && net.input_size() == num_features,
        }
    }
}

impl Trainable for NetworkModel {
    fn params(&self) -> &[f64] {
        self.inner().params()
    }

    fn params_mut(&mut self) -> &mut [f64] {
        match self {
            NetworkModel::Dense(net) | NetworkModel::Linear(net) => net.params_mut(),
            NetworkModel::Recurrent(net) => net.params_mut(),
        }
    }

    fn forward(&self, window: &Window) -> f64 {
        self.inner().forward(window)
    }

    fn accumulate_gradient(&self, window: &Window, label: f64, scale: f64, grad: &mut [f64]) -> f64 {
        self.inner().accumulate_gradient(window, label, scale, grad)
    }
}

impl Model for NetworkModel {
    fn predict(&self, window: &Window) -> f64 {
        self.forward(window)
    }

    fn architecture(&self) -> Architecture {
        match self {
            NetworkModel::Dense(_) => Architecture::Dense,
            NetworkModel::Linear(_) => Architecture::Linear,
            NetworkModel::Recurrent(_) => Architecture::Recurrent,
        }
    }

    fn as_network(&self) -> Option<&NetworkModel> {
        Some(self)
    }
}
