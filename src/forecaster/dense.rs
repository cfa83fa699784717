//! Fully connected network over a flattened window.
//!
//! Parameters live in one flat vector, layer by layer: the `fan_out x fan_in`
//! weight matrix (row-major) followed by `fan_out` biases. Hidden layers use
//! ReLU; the single output unit is linear.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::network::{glorot_uniform, Trainable};
use crate::types::Window;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Layer widths, input first, output (always 1) last.
    layers: Vec<usize>,
    params: Vec<f64>,
}

impl DenseNetwork {
    /// `input -> hidden[0] -> ... -> 1`, Glorot-uniform weights, zero biases.
    pub fn new<R: Rng>(input: usize, hidden: &[usize], rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(hidden.len() + 2);
        layers.push(input);
        layers.extend_from_slice(hidden);
        layers.push(1);

        let mut params = Vec::new();
        for pair in layers.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            params.extend(glorot_uniform(rng, fan_in, fan_out, fan_in * fan_out));
            params.extend(std::iter::repeat(0.0).take(fan_out));
        }
        Self { layers, params }
    }

    /// Width of the flattened input.
    pub fn input_size(&self) -> usize {
        self.layers.first().copied().unwrap_or(0)
    }

    /// Hidden layer widths (empty for a single affine unit).
    pub fn hidden(&self) -> &[usize] {
        let n = self.layers.len();
        if n < 2 {
            &[]
        } else {
            &self.layers[1..n - 1]
        }
    }

    /// Checks the layer layout against the parameter count.
    pub fn is_consistent(&self) -> bool {
        self.layers.len() >= 2
            && self.layers.last() == Some(&1)
            && self.params.len() == Self::param_count(&self.layers)
    }

    fn param_count(layers: &[usize]) -> usize {
        layers.windows(2).map(|p| p[0] * p[1] + p[1]).sum()
    }

    fn num_layers(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }

    /// Activations of every layer, input first.
    fn trace(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let n_layers = self.num_layers();
        let mut acts = Vec::with_capacity(n_layers + 1);
        acts.push(input.to_vec());

        let mut offset = 0;
        for l in 0..n_layers {
            let (fan_in, fan_out) = (self.layers[l], self.layers[l + 1]);
            let weights = &self.params[offset..offset + fan_in * fan_out];
            let biases = &self.params[offset + fan_in * fan_out..offset + fan_in * fan_out + fan_out];
            let prev = &acts[l];

            let out: Vec<f64> = (0..fan_out)
                .map(|j| {
                    let row = &weights[j * fan_in..(j + 1) * fan_in];
                    let z = biases[j] + row.iter().zip(prev).map(|(w, x)| w * x).sum::<f64>();
                    if l + 1 < n_layers {
                        z.max(0.0)
                    } else {
                        z
                    }
                })
                .collect();
            acts.push(out);
            offset += fan_in * fan_out + fan_out;
        }
        acts
    }
}

impl Trainable for DenseNetwork {
    fn params(&self) -> &[f64] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn forward(&self, window: &Window) -> f64 {
        self.trace(&window.flatten())
            .last()
            .and_then(|out| out.first().copied())
            .unwrap_or(0.0)
    }

    fn accumulate_gradient(&self, window: &Window, label: f64, scale: f64, grad: &mut [f64]) -> f64 {
        let acts = self.trace(&window.flatten());
        let prediction = acts
            .last()
            .and_then(|out| out.first().copied())
            .unwrap_or(0.0);

        let mut offsets = Vec::with_capacity(self.num_layers());
        let mut offset = 0;
        for pair in self.layers.windows(2) {
            offsets.push(offset);
            offset += pair[0] * pair[1] + pair[1];
        }

        // d(scale * (y - label)^2) / dy
        let mut delta = vec![2.0 * (prediction - label) * scale];
        for l in (0..self.num_layers()).rev() {
            let (fan_in, fan_out) = (self.layers[l], self.layers[l + 1]);
            let base = offsets[l];
            let prev = &acts[l];

            for (j, &d) in delta.iter().enumerate() {
                let row = base + j * fan_in;
                for (i, &x) in prev.iter().enumerate() {
                    grad[row + i] += d * x;
                }
                grad[base + fan_in * fan_out + j] += d;
            }

            if l > 0 {
                let weights = &self.params[base..base + fan_in * fan_out];
                delta = (0..fan_in)
                    .map(|i| {
                        if prev[i] > 0.0 {
                            delta
                                .iter()
                                .enumerate()
                                .map(|(j, d)| weights[j * fan_in + i] * d)
                                .sum()
                        } else {
                            0.0
                        }
                    })
                    .collect();
            }
        }
        prediction
    }
}
