//! Single-layer LSTM over the window steps with a linear read-out.
//!
//! Gate order is input, forget, cell, output. Forget biases start at 1.
//! Gradients are computed with full backpropagation through time over the
//! window.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::network::{glorot_uniform, Trainable};
use crate::types::Window;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrentNetwork {
    input_size: usize,
    hidden_size: usize,
    params: Vec<f64>,
}

/// Per-step forward state kept for backpropagation.
struct StepCache {
    x: Vec<f64>,
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    i: Vec<f64>,
    f: Vec<f64>,
    g: Vec<f64>,
    o: Vec<f64>,
    c: Vec<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl RecurrentNetwork {
    pub fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let gates = 4 * hidden_size;
        let mut params = Vec::with_capacity(Self::param_count(input_size, hidden_size));
        params.extend(glorot_uniform(rng, input_size, gates, gates * input_size));
        params.extend(glorot_uniform(rng, hidden_size, gates, gates * hidden_size));
        for gate in 0..4 {
            let bias = if gate == 1 { 1.0 } else { 0.0 };
            params.extend(std::iter::repeat(bias).take(hidden_size));
        }
        params.extend(glorot_uniform(rng, hidden_size, 1, hidden_size));
        params.push(0.0);
        Self {
            input_size,
            hidden_size,
            params,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn is_consistent(&self) -> bool {
        self.params.len() == Self::param_count(self.input_size, self.hidden_size)
    }

    fn param_count(input: usize, hidden: usize) -> usize {
        4 * hidden * (input + hidden + 1) + hidden + 1
    }

    // Offsets into `params`.
    fn u_offset(&self) -> usize {
        4 * self.hidden_size * self.input_size
    }

    fn b_offset(&self) -> usize {
        self.u_offset() + 4 * self.hidden_size * self.hidden_size
    }

    fn head_offset(&self) -> usize {
        self.b_offset() + 4 * self.hidden_size
    }

    fn run(&self, window: &Window) -> (Vec<StepCache>, Vec<f64>, f64) {
        let hs = self.hidden_size;
        let (w, rest) = self.params.split_at(self.u_offset());
        let (u, rest) = rest.split_at(4 * hs * hs);
        let (b, head) = rest.split_at(4 * hs);

        let mut h = vec![0.0; hs];
        let mut c = vec![0.0; hs];
        let mut caches = Vec::with_capacity(window.len());

        for x in window.steps() {
            let z: Vec<f64> = (0..4 * hs)
                .map(|row| {
                    let wx: f64 = w[row * self.input_size..(row + 1) * self.input_size]
                        .iter()
                        .zip(x)
                        .map(|(a, b)| a * b)
                        .sum();
                    let uh: f64 = u[row * hs..(row + 1) * hs]
                        .iter()
                        .zip(&h)
                        .map(|(a, b)| a * b)
                        .sum();
                    b[row] + wx + uh
                })
                .collect();

            let i: Vec<f64> = z[..hs].iter().map(|&v| sigmoid(v)).collect();
            let f: Vec<f64> = z[hs..2 * hs].iter().map(|&v| sigmoid(v)).collect();
            let g: Vec<f64> = z[2 * hs..3 * hs].iter().map(|&v| v.tanh()).collect();
            let o: Vec<f64> = z[3 * hs..].iter().map(|&v| sigmoid(v)).collect();

            let c_new: Vec<f64> = (0..hs).map(|k| f[k] * c[k] + i[k] * g[k]).collect();
            let h_new: Vec<f64> = (0..hs).map(|k| o[k] * c_new[k].tanh()).collect();

            caches.push(StepCache {
                x: x.clone(),
                h_prev: std::mem::replace(&mut h, h_new),
                c_prev: std::mem::replace(&mut c, c_new.clone()),
                i,
                f,
                g,
                o,
                c: c_new,
            });
        }

        let y = head[hs] + head[..hs].iter().zip(&h).map(|(a, b)| a * b).sum::<f64>();
        (caches, h, y)
    }
}

impl Trainable for RecurrentNetwork {
    fn params(&self) -> &[f64] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f64] {
        &mut self.params
    }

    fn forward(&self, window: &Window) -> f64 {
        self.run(window).2
    }

    fn accumulate_gradient(&self, window: &Window, label: f64, scale: f64, grad: &mut [f64]) -> f64 {
        let hs = self.hidden_size;
        let input = self.input_size;
        let (u_off, b_off, head_off) = (self.u_offset(), self.b_offset(), self.head_offset());
        let (caches, h_last, prediction) = self.run(window);

        let d_out = 2.0 * (prediction - label) * scale;
        for k in 0..hs {
            grad[head_off + k] += d_out * h_last[k];
        }
        grad[head_off + hs] += d_out;

        let mut dh: Vec<f64> = self.params[head_off..head_off + hs]
            .iter()
            .map(|w| w * d_out)
            .collect();
        let mut dc = vec![0.0; hs];
        let mut dz = vec![0.0; 4 * hs];

        for step in caches.iter().rev() {
            for k in 0..hs {
                let tc = step.c[k].tanh();
                let d_o = dh[k] * tc;
                dc[k] += dh[k] * step.o[k] * (1.0 - tc * tc);

                let d_i = dc[k] * step.g[k];
                let d_g = dc[k] * step.i[k];
                let d_f = dc[k] * step.c_prev[k];

                dz[k] = d_i * step.i[k] * (1.0 - step.i[k]);
                dz[hs + k] = d_f * step.f[k] * (1.0 - step.f[k]);
                dz[2 * hs + k] = d_g * (1.0 - step.g[k] * step.g[k]);
                dz[3 * hs + k] = d_o * step.o[k] * (1.0 - step.o[k]);

                dc[k] *= step.f[k];
            }

            let mut dh_prev = vec![0.0; hs];
            for (row, &d) in dz.iter().enumerate() {
                for (col, &x) in step.x.iter().enumerate() {
                    grad[row * input + col] += d * x;
                }
                let u_row = u_off + row * hs;
                for col in 0..hs {
                    grad[u_row + col] += d * step.h_prev[col];
                    dh_prev[col] += self.params[u_row + col] * d;
                }
                grad[b_off + row] += d;
            }
            dh = dh_prev;
        }
        prediction
    }
}
