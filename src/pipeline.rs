//! Pipeline state: the loaded series and the single live trained model.
//!
//! ```text
//! Series ─► normalizer::fit ─► windower ─► Forecaster::fit ─► TrainingSession
//!                                                                  │ finish()
//!                                                                  ▼
//!                              predictor ◄── TrainedPipeline {stats, model}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::forecaster::{Forecaster, Model, TrainingRun};
use crate::normalizer;
use crate::predictor;
use crate::scorer;
use crate::types::{
    Evaluation, FeatureStats, ForecasterConfig, PredictionRequest, PredictionResult,
    Series, TrainingProgress, TrainingSet,
};
use crate::windower;

/// What to train: inputs, target, window length and hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    /// Input features, in window-step order. May include the target.
    pub features: Vec<String>,
    pub target: String,
    pub window_size: usize,
    pub config: ForecasterConfig,
}

impl TrainingRequest {
    pub fn new(features: Vec<String>, target: impl Into<String>, window_size: usize) -> Self {
        Self {
            features,
            target: target.into(),
            window_size,
            config: ForecasterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ForecasterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one input feature is required".to_string(),
            ));
        }
        if self.target.trim().is_empty() {
            return Err(PipelineError::InvalidConfig("target feature is empty".to_string()));
        }
        if self.window_size == 0 {
            return Err(PipelineError::InvalidConfig("window_size must be > 0".to_string()));
        }
        self.config.validate()
    }

    /// Features that need statistics: inputs plus target, without repeats.
    fn stat_features(&self) -> Vec<&str> {
        let mut features: Vec<&str> = Vec::with_capacity(self.features.len() + 1);
        for f in self.features.iter().map(String::as_str).chain([self.target.as_str()]) {
            if !features.contains(&f) {
                features.push(f);
            }
        }
        features
    }
}

/// Every available feature except `target`; the target alone when the
/// series has nothing else.
pub fn default_features(series: &Series, target: &str) -> Vec<String> {
    let features: Vec<String> = series
        .available_features()
        .into_iter()
        .filter(|f| f != target)
        .collect();
    if features.is_empty() {
        vec![target.to_string()]
    } else {
        features
    }
}

/// A fitted `{stats, model}` pair and everything needed to predict with it.
#[derive(Debug)]
pub struct TrainedPipeline {
    pub features: Vec<String>,
    pub target: String,
    pub window_size: usize,
    pub stats: FeatureStats,
    pub config: ForecasterConfig,
    pub model: Box<dyn Model>,
    pub history: Vec<TrainingProgress>,
    /// Scores on the held-out pairs; `None` when nothing was held out.
    pub evaluation: Option<Evaluation>,
    pub trained_at: DateTime<Utc>,
}

impl TrainedPipeline {
    pub fn new(
        features: Vec<String>,
        target: String,
        window_size: usize,
        stats: FeatureStats,
        config: ForecasterConfig,
        model: Box<dyn Model>,
    ) -> Self {
        Self {
            features,
            target,
            window_size,
            stats,
            config,
            model,
            history: Vec::new(),
            evaluation: None,
            trained_at: Utc::now(),
        }
    }

    /// Loss of the final epoch, if any epoch reported.
    pub fn final_loss(&self) -> Option<f64> {
        self.history.last().map(|p| p.training_loss)
    }

    pub fn predict(&self, series: &Series, request: &PredictionRequest) -> Result<PredictionResult> {
        predictor::predict(self, series, request)
    }
}

/// Score `model` on held-out pairs, in normalized and target units.
pub fn evaluate(
    model: &dyn Model,
    holdout: &TrainingSet,
    target: &str,
    stats: &FeatureStats,
) -> Result<Option<Evaluation>> {
    if holdout.is_empty() {
        return Ok(None);
    }
    let predictions: Vec<f64> = holdout.windows.iter().map(|w| model.predict(w)).collect();
    let metrics = scorer::score(&predictions, &holdout.labels)?;
    let scale = stats.require(target)?.scale();
    Ok(Some(Evaluation {
        samples: holdout.len(),
        mse: metrics.mse,
        mae: metrics.mae,
        rmse: metrics.rmse,
        denormalized_mae: metrics.mae * scale,
    }))
}

/// A training run started by [`PipelineState::start_training`].
///
/// Progress observed through [`next_progress`](Self::next_progress) is
/// recorded into the pipeline's history.
#[derive(Debug)]
pub struct TrainingSession {
    request: TrainingRequest,
    stats: FeatureStats,
    holdout: TrainingSet,
    run: TrainingRun,
    history: Vec<TrainingProgress>,
}

impl TrainingSession {
    pub fn request(&self) -> &TrainingRequest {
        &self.request
    }

    pub fn history(&self) -> &[TrainingProgress] {
        &self.history
    }

    pub async fn next_progress(&mut self) -> Option<TrainingProgress> {
        let progress = self.run.next_progress().await?;
        self.history.push(progress);
        Some(progress)
    }

    pub fn cancel(&self) {
        self.run.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.run.cancellation_token()
    }

    /// Wait for the model and score it on the held-out pairs.
    pub async fn finish(self) -> Result<TrainedPipeline> {
        let TrainingSession {
            request,
            stats,
            holdout,
            mut run,
            mut history,
        } = self;

        while let Some(progress) = run.next_progress().await {
            history.push(progress);
        }
        let model = run.finish().await?;
        let evaluation = evaluate(model.as_ref(), &holdout, &request.target, &stats)?;

        if let Some(eval) = &evaluation {
            info!(
                samples = eval.samples,
                mse = eval.mse,
                mae = eval.mae,
                denormalized_mae = eval.denormalized_mae,
                "Held-out evaluation"
            );
        }

        Ok(TrainedPipeline {
            features: request.features,
            target: request.target,
            window_size: request.window_size,
            stats,
            config: request.config,
            model,
            history,
            evaluation,
            trained_at: Utc::now(),
        })
    }
}

/// The loaded series and at most one trained pipeline.
#[derive(Debug, Default)]
pub struct PipelineState {
    series: Option<Series>,
    trained: Option<TrainedPipeline>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the working series. A trained model stays installed.
    pub fn load_series(&mut self, series: Series) {
        info!(observations = series.len(), "Series loaded");
        self.series = Some(series);
    }

    pub fn series(&self) -> Option<&Series> {
        self.series.as_ref()
    }

    pub fn trained(&self) -> Option<&TrainedPipeline> {
        self.trained.as_ref()
    }

    /// Make `trained` the live model, dropping any previous one.
    pub fn install(&mut self, trained: TrainedPipeline) {
        if self.trained.replace(trained).is_some() {
            info!("Replaced previous model");
        }
    }

    /// Drop the live model.
    pub fn clear_model(&mut self) -> Option<TrainedPipeline> {
        self.trained.take()
    }

    /// Normalize, window and start fitting on the loaded series.
    ///
    /// Any previous model is released before work starts, even if this call
    /// then fails.
    pub fn start_training(
        &mut self,
        forecaster: &dyn Forecaster,
        request: TrainingRequest,
    ) -> Result<TrainingSession> {
        request.validate()?;
        if self.trained.take().is_some() {
            info!("Released previous model before training");
        }

        let series = self.series.as_ref().ok_or(PipelineError::EmptyInput)?;
        let stats = normalizer::fit(series, &request.stat_features())?;
        let set = windower::build_training_set(
            series,
            &request.features,
            &request.target,
            request.window_size,
            &stats,
        )?;

        let (_, holdout) = set.split(request.config.train_ratio());
        if holdout.is_empty() && request.config.validation_split > 0.0 {
            warn!(pairs = set.len(), "Too few pairs to hold out any for validation");
        }

        info!(
            features = ?request.features,
            target = %request.target,
            window_size = request.window_size,
            pairs = set.len(),
            held_out = holdout.len(),
            "Training pipeline"
        );

        let run = forecaster.fit(set.windows, set.labels, &request.config)?;
        Ok(TrainingSession {
            request,
            stats,
            holdout,
            run,
            history: Vec::new(),
        })
    }

    /// Predict with the live model over the loaded series.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let trained = self.trained.as_ref().ok_or(PipelineError::NoModel)?;
        match request {
            PredictionRequest::Custom { .. } => {
                trained.predict(self.series.as_ref().unwrap_or(&Series::default()), request)
            }
            _ => {
                let series = self.series.as_ref().ok_or(PipelineError::EmptyInput)?;
                trained.predict(series, request)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Architecture, Window};
    use chrono::NaiveDate;

    /// Always predicts zero (the normalized mean) and reports one epoch.
    #[derive(Debug)]
    struct MeanModel;

    impl Model for MeanModel {
        fn predict(&self, _window: &Window) -> f64 {
            0.0
        }

        fn architecture(&self) -> Architecture {
            Architecture::Linear
        }
    }

    struct MeanForecaster;

    impl Forecaster for MeanForecaster {
        fn fit(
            &self,
            windows: Vec<Window>,
            labels: Vec<f64>,
            _config: &ForecasterConfig,
        ) -> Result<TrainingRun> {
            crate::forecaster::check_pairs(&windows, &labels)?;
            let progress = TrainingProgress {
                epoch: 0,
                training_loss: 1.0,
                validation_loss: None,
                training_mae: 1.0,
                validation_mae: None,
            };
            Ok(TrainingRun::completed(vec![progress], Box::new(MeanModel)))
        }
    }

    fn state(values: &[f64]) -> PipelineState {
        let mut state = PipelineState::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        state.load_series(Series::from_values("pm25", start, values));
        state
    }

    fn request(w: usize) -> TrainingRequest {
        TrainingRequest::new(vec!["pm25".to_string()], "pm25", w)
    }

    #[tokio::test]
    async fn test_training_installs_single_model() {
        let mut state = state(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0]);
        let mut session = state.start_training(&MeanForecaster, request(2)).unwrap();
        assert!(session.next_progress().await.is_some());
        assert_eq!(session.history().len(), 1);

        let trained = session.finish().await.unwrap();
        assert_eq!(trained.history.len(), 1);
        assert_eq!(trained.final_loss(), Some(1.0));
        // 5 pairs, 80% train: 4 train + 1 held out
        let eval = trained.evaluation.unwrap();
        assert_eq!(eval.samples, 1);
        state.install(trained);
        assert!(state.trained().is_some());

        // Starting a new run releases the installed model
        let _session = state.start_training(&MeanForecaster, request(2)).unwrap();
        assert!(state.trained().is_none());
    }

    #[tokio::test]
    async fn test_evaluation_denormalizes_mae() {
        let mut state = state(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0]);
        let req = request(2).with_config(ForecasterConfig {
            validation_split: 0.5,
            ..Default::default()
        });
        let trained = state.start_training(&MeanForecaster, req).unwrap().finish().await.unwrap();
        let eval = trained.evaluation.unwrap();
        let std = trained.stats.get("pm25").unwrap().std;
        assert_eq!(eval.samples, 2);
        assert!((eval.denormalized_mae - eval.mae * std).abs() < 1e-12);
        assert!((eval.rmse - eval.mse.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_holdout_is_trailing_split() {
        let values: Vec<f64> = (0..10).map(f64::from).collect();
        let mut state = state(&values);
        let req = request(2).with_config(ForecasterConfig {
            validation_split: 0.25,
            ..Default::default()
        });
        let session = state.start_training(&MeanForecaster, req).unwrap();

        let series = state.series().unwrap();
        let set = windower::build_training_set(series, &["pm25"], "pm25", 2, &session.stats).unwrap();
        let (train, holdout) = set.split(0.75);
        assert_eq!(train.len(), 6);
        assert_eq!(session.holdout, holdout);
    }

    #[test]
    fn test_request_validation() {
        let mut state = state(&[1.0, 2.0, 3.0]);
        let empty = TrainingRequest::new(Vec::new(), "pm25", 1);
        assert!(matches!(
            state.start_training(&MeanForecaster, empty),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            state.start_training(&MeanForecaster, request(0)),
            Err(PipelineError::InvalidConfig(_))
        ));
        assert!(matches!(
            state.start_training(&MeanForecaster, request(3)),
            Err(PipelineError::InsufficientData { needed: 4, available: 3 })
        ));
    }

    #[test]
    fn test_training_without_series() {
        let mut state = PipelineState::new();
        assert!(matches!(
            state.start_training(&MeanForecaster, request(1)),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn test_predict_without_model() {
        let state = state(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            state.predict(&PredictionRequest::Future { steps: 1 }),
            Err(PipelineError::NoModel)
        ));
    }

    #[test]
    fn test_default_features() {
        let univariate = state(&[1.0, 2.0]);
        let series = univariate.series().unwrap();
        assert_eq!(default_features(series, "pm25"), vec!["pm25"]);

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = crate::types::Observation::new(date)
            .with("pm25", 1.0)
            .with("no2", 2.0)
            .with("aqi", 3.0);
        let series = Series::new(vec![obs]);
        assert_eq!(default_features(&series, "pm25"), vec!["aqi", "no2"]);
    }

    #[test]
    fn test_stat_features_dedupes_target() {
        let req = TrainingRequest::new(vec!["pm10".to_string(), "pm25".to_string()], "pm25", 3);
        assert_eq!(req.stat_features(), vec!["pm10", "pm25"]);
    }
}
