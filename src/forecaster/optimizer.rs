//! Adam optimizer and gradient clipping over flat parameter vectors.

/// Max gradient norm for global gradient clipping.
pub const MAX_GRAD_NORM: f64 = 5.0;

/// Adam optimizer state.
///
/// Parameters and gradients are passed as flat slices; the moment vectors
/// share their layout.
#[derive(Debug, Clone)]
pub struct AdamOptimizer {
    /// Step size.
    pub lr: f64,
    /// First moment decay.
    pub beta1: f64,
    /// Second moment decay.
    pub beta2: f64,
    /// Numerical stability term.
    pub eps: f64,
    /// Total steps taken.
    pub steps: u64,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl AdamOptimizer {
    pub fn new(num_params: usize, lr: f64) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            steps: 0,
            m: vec![0.0; num_params],
            v: vec![0.0; num_params],
        }
    }

    /// Apply one bias-corrected Adam update.
    pub fn apply(&mut self, params: &mut [f64], grads: &[f64]) {
        self.steps += 1;
        let t = self.steps as f64;
        let lr_t = self.lr * (1.0 - self.beta2.powf(t)).sqrt() / (1.0 - self.beta1.powf(t));

        for (i, (param, &g)) in params.iter_mut().zip(grads).enumerate() {
            self.m[i] = self.beta1 * self.m[i] + (1.0 - self.beta1) * g;
            self.v[i] = self.beta2 * self.v[i] + (1.0 - self.beta2) * g * g;
            *param -= lr_t * self.m[i] / (self.v[i].sqrt() + self.eps);
        }
    }
}

/// L2 norm of a gradient vector.
pub fn grad_norm(grads: &[f64]) -> f64 {
    grads.iter().map(|g| g * g).sum::<f64>().sqrt()
}

/// Rescale `grads` in place so its norm is at most `max_norm`.
/// Returns the norm before clipping.
pub fn clip_grad_norm(grads: &mut [f64], max_norm: f64) -> f64 {
    let norm = grad_norm(grads);
    if norm > max_norm {
        let factor = max_norm / norm;
        grads.iter_mut().for_each(|g| *g *= factor);
    }
    norm
}
