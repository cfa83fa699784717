//! Built-in gradient-trained forecaster.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::network::{NetworkModel, Trainable};
use super::optimizer::{clip_grad_norm, AdamOptimizer, MAX_GRAD_NORM};
use super::{check_pairs, Forecaster, Model, TrainingRun};
use crate::error::{PipelineError, Result};
use crate::types::{split_index, ForecasterConfig, TrainingProgress, Window};

/// Trains a [`NetworkModel`] of the configured architecture with mini-batch
/// Adam on MSE loss.
///
/// The trailing `validation_split` share of the pairs is held out and only
/// used for the per-epoch validation metrics. Runs on tokio's blocking pool,
/// so [`fit`](Forecaster::fit) must be called from inside a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeuralForecaster;

impl NeuralForecaster {
    pub fn new() -> Self {
        Self
    }
}

impl Forecaster for NeuralForecaster {
    fn fit(
        &self,
        windows: Vec<Window>,
        labels: Vec<f64>,
        config: &ForecasterConfig,
    ) -> Result<TrainingRun> {
        check_pairs(&windows, &labels)?;
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            PipelineError::Training("neural training requires a tokio runtime".to_string())
        })?;

        info!(
            architecture = %config.architecture,
            pairs = windows.len(),
            epochs = config.epochs,
            batch_size = config.batch_size,
            learning_rate = config.learning_rate,
            "Starting training"
        );

        let config = config.clone();
        Ok(TrainingRun::spawn(&runtime, move |progress, cancel| {
            train(&windows, &labels, &config, &progress, &cancel)
                .map(|model| Box::new(model) as Box<dyn Model>)
        }))
    }
}

/// MSE and MAE of `model` over a set of pairs.
fn evaluate(model: &NetworkModel, windows: &[Window], labels: &[f64]) -> (f64, f64) {
    let n = windows.len().max(1) as f64;
    let (sq, abs) = windows
        .iter()
        .zip(labels)
        .fold((0.0, 0.0), |(sq, abs), (w, &y)| {
            let err = model.forward(w) - y;
            (sq + err * err, abs + err.abs())
        });
    (sq / n, abs / n)
}

/// The numeric training loop. Blocking.
pub(crate) fn train(
    windows: &[Window],
    labels: &[f64],
    config: &ForecasterConfig,
    progress: &mpsc::UnboundedSender<TrainingProgress>,
    cancel: &CancellationToken,
) -> Result<NetworkModel> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let (steps, features) = (windows[0].len(), windows[0].num_features());
    let mut model = NetworkModel::new(config.architecture, steps, features, &mut rng);
    let mut optimizer = AdamOptimizer::new(model.params().len(), config.learning_rate);

    let cut = split_index(windows.len(), config.train_ratio());
    let (train_windows, val_windows) = windows.split_at(cut);
    let (train_labels, val_labels) = labels.split_at(cut);

    let mut order: Vec<usize> = (0..cut).collect();
    let mut grad = vec![0.0; model.params().len()];

    for epoch in 0..config.epochs {
        if cancel.is_cancelled() {
            info!(epoch, "Training cancelled");
            return Err(PipelineError::Training("training cancelled".to_string()));
        }

        order.shuffle(&mut rng);
        for batch in order.chunks(config.batch_size) {
            grad.fill(0.0);
            let scale = 1.0 / batch.len() as f64;
            for &i in batch {
                model.accumulate_gradient(&train_windows[i], train_labels[i], scale, &mut grad);
            }
            clip_grad_norm(&mut grad, MAX_GRAD_NORM);
            optimizer.apply(model.params_mut(), &grad);
        }

        let (training_loss, training_mae) = evaluate(&model, train_windows, train_labels);
        if !training_loss.is_finite() {
            return Err(PipelineError::Training(format!(
                "loss diverged at epoch {epoch}"
            )));
        }
        let validation =
            (!val_windows.is_empty()).then(|| evaluate(&model, val_windows, val_labels));

        let event = TrainingProgress {
            epoch,
            training_loss,
            validation_loss: validation.map(|(loss, _)| loss),
            training_mae,
            validation_mae: validation.map(|(_, mae)| mae),
        };
        debug!(
            epoch,
            loss = training_loss,
            val_loss = ?event.validation_loss,
            mae = training_mae,
            "Epoch complete"
        );
        // A dropped receiver does not stop training
        let _ = progress.send(event);
    }

    info!(epochs = config.epochs, steps = optimizer.steps, "Training finished");
    Ok(model)
}
