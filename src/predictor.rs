//! Prediction modes over a trained pipeline.
//!
//! Every mode builds normalized windows with the pipeline's own statistics,
//! runs the model and maps the output back to the target's units.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::normalizer::{denormalize, feature_vector};
use crate::pipeline::TrainedPipeline;
use crate::types::{
    Observation, PredictionMode, PredictionPoint, PredictionRequest, PredictionResult, Series,
    Window,
};
use crate::windower::{trailing_window, window_at};

fn predict_window(trained: &TrainedPipeline, window: &Window) -> Result<f64> {
    let normalized = trained.model.predict(window);
    denormalize(normalized, &trained.target, &trained.stats)
}

fn result(trained: &TrainedPipeline, mode: PredictionMode, points: Vec<PredictionPoint>) -> PredictionResult {
    debug!(mode = %mode, points = points.len(), target = %trained.target, "Prediction complete");
    PredictionResult {
        mode,
        target: trained.target.clone(),
        points,
    }
}

/// Replay the last `steps` observations, each predicted from the window
/// that precedes it, alongside its actual value.
pub fn historical(trained: &TrainedPipeline, series: &Series, steps: usize) -> Result<PredictionResult> {
    if steps == 0 {
        return Ok(result(trained, PredictionMode::Historical, Vec::new()));
    }

    let n = series.len();
    let w = trained.window_size;
    if steps > n {
        return Err(PipelineError::InsufficientData { needed: steps, available: n });
    }
    if steps + w > n {
        return Err(PipelineError::InsufficientData { needed: steps + w, available: n });
    }
    trained.stats.require(&trained.target)?;

    // Inputs and actuals are all resolved before the model runs
    let inputs = (n - steps..n)
        .map(|j| {
            let window = window_at(series, &trained.features, j - w, w, &trained.stats)?;
            let obs = &series.observations()[j];
            Ok((obs.date, window, obs.require(&trained.target)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let points = inputs
        .into_iter()
        .map(|(date, window, actual)| {
            Ok(PredictionPoint {
                date,
                predicted: predict_window(trained, &window)?,
                actual: Some(actual),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(result(trained, PredictionMode::Historical, points))
}

/// `steps` forecasts past the end of the series.
///
/// Every step is predicted from the same trailing window, so all values are
/// identical; only the dates advance, one day per step.
pub fn future(trained: &TrainedPipeline, series: &Series, steps: usize) -> Result<PredictionResult> {
    trained.stats.require(&trained.target)?;
    let window = trailing_window(series, &trained.features, trained.window_size, &trained.stats)?;
    let last_date = series.last_date().ok_or(PipelineError::EmptyInput)?;
    let predicted = predict_window(trained, &window)?;

    let points = (1..=steps as u64)
        .map(|i| {
            Ok(PredictionPoint {
                date: next_date(last_date, i)?,
                predicted,
                actual: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(result(trained, PredictionMode::Future, points))
}

fn next_date(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| PipelineError::InvalidConfig(format!("{date} + {days} days is out of range")))
}

/// One prediction from a caller-supplied observation, repeated over every
/// step of the window.
pub fn custom(trained: &TrainedPipeline, input: &Observation) -> Result<PredictionResult> {
    trained.stats.require(&trained.target)?;
    let step = feature_vector(input, &trained.features, &trained.stats)?;
    let window = Window::new(vec![step; trained.window_size]);
    let point = PredictionPoint {
        date: input.date,
        predicted: predict_window(trained, &window)?,
        actual: None,
    };
    Ok(result(trained, PredictionMode::Custom, vec![point]))
}

/// Dispatch on the request's mode.
pub fn predict(
    trained: &TrainedPipeline,
    series: &Series,
    request: &PredictionRequest,
) -> Result<PredictionResult> {
    match request {
        PredictionRequest::Historical { steps } => historical(trained, series, *steps),
        PredictionRequest::Future { steps } => future(trained, series, *steps),
        PredictionRequest::Custom { input } => custom(trained, input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecaster::Model;
    use crate::normalizer::fit;
    use crate::types::{Architecture, ForecasterConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Predicts the normalized value of the last feature of the last step.
    #[derive(Debug)]
    struct LastValue;

    impl Model for LastValue {
        fn predict(&self, window: &Window) -> f64 {
            window.steps().last().and_then(|s| s.last().copied()).unwrap_or(0.0)
        }

        fn architecture(&self) -> Architecture {
            Architecture::Linear
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn setup(values: &[f64], w: usize) -> (TrainedPipeline, Series) {
        let series = Series::from_values("pm25", d(1), values);
        let stats = fit(&series, &["pm25"]).unwrap();
        let trained = TrainedPipeline::new(
            vec!["pm25".to_string()],
            "pm25".to_string(),
            w,
            stats,
            ForecasterConfig::default(),
            Box::new(LastValue),
        );
        (trained, series)
    }

    #[test]
    fn test_historical_pairs_prediction_with_actual() {
        let (trained, series) = setup(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0], 2);
        let result = historical(&trained, &series, 3).unwrap();
        assert_eq!(result.len(), 3);
        // Last-value model: predicting index j yields the value at j-1
        let expected = [(16.0, 14.0), (18.0, 16.0), (20.0, 18.0)];
        for (point, (actual, predicted)) in result.points.iter().zip(expected) {
            assert_eq!(point.actual, Some(actual));
            assert!((point.predicted - predicted).abs() < 1e-9);
        }
        assert_eq!(result.points[0].date, d(4));
    }

    #[test]
    fn test_historical_bounds() {
        let (trained, series) = setup(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0], 2);
        assert!(historical(&trained, &series, 0).unwrap().is_empty());
        assert!(historical(&trained, &series, 4).is_ok());
        assert!(matches!(
            historical(&trained, &series, 5),
            Err(PipelineError::InsufficientData { needed: 7, available: 6 })
        ));
        assert!(matches!(
            historical(&trained, &series, 7),
            Err(PipelineError::InsufficientData { needed: 7, available: 6 })
        ));
    }

    #[test]
    fn test_future_repeats_single_prediction() {
        let (trained, series) = setup(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0], 2);
        let result = future(&trained, &series, 3).unwrap();
        assert_eq!(result.len(), 3);
        let first = result.points[0].predicted;
        assert!(result.points.iter().all(|p| p.predicted == first));
        assert!((first - 20.0).abs() < 1e-9);
        assert_eq!(
            result.points.iter().map(|p| p.date).collect::<Vec<_>>(),
            vec![d(7), d(8), d(9)]
        );
        assert!(result.actuals().is_none());
    }

    #[test]
    fn test_future_requires_more_than_window() {
        let (trained, series) = setup(&[10.0, 12.0], 2);
        assert!(matches!(
            future(&trained, &series, 1),
            Err(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_custom_single_point() {
        let (trained, _) = setup(&[10.0, 12.0, 14.0], 2);
        let input = Observation::new(d(20)).with("pm25", 13.0);
        let result = predict(&trained, &Series::default(), &PredictionRequest::Custom { input }).unwrap();
        assert_eq!(result.mode, PredictionMode::Custom);
        assert_eq!(result.len(), 1);
        assert_eq!(result.points[0].date, d(20));
        assert!((result.points[0].predicted - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_missing_feature() {
        let (trained, _) = setup(&[10.0, 12.0, 14.0], 2);
        let input = Observation::new(d(20)).with("no2", 13.0);
        assert!(matches!(
            custom(&trained, &input),
            Err(PipelineError::MissingFeature { .. })
        ));
    }

    /// Counts calls and predicts zero.
    #[derive(Debug, Default)]
    struct CountingModel {
        calls: Arc<AtomicUsize>,
    }

    impl Model for CountingModel {
        fn predict(&self, _window: &Window) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            0.0
        }

        fn architecture(&self) -> Architecture {
            Architecture::Linear
        }
    }

    #[test]
    fn test_missing_target_stats() {
        let (mut trained, series) = setup(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0], 2);
        let calls = Arc::new(AtomicUsize::new(0));
        trained.model = Box::new(CountingModel { calls: Arc::clone(&calls) });
        trained.target = "aqi".to_string();

        let input = Observation::new(d(20)).with("pm25", 13.0);
        for request in [
            PredictionRequest::Historical { steps: 4 },
            PredictionRequest::Future { steps: 1 },
            PredictionRequest::Custom { input },
        ] {
            let err = predict(&trained, &series, &request).unwrap_err();
            assert!(
                matches!(&err, PipelineError::MissingStats { feature } if feature == "aqi"),
                "{err:?}"
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0, "model ran before stats were checked");
    }

    #[test]
    fn test_historical_missing_actual_fails_before_model() {
        let (mut trained, _) = setup(&[10.0, 12.0, 14.0], 2);
        let calls = Arc::new(AtomicUsize::new(0));
        trained.model = Box::new(CountingModel { calls: Arc::clone(&calls) });

        // pm25 is present in every step but missing on the last replayed day
        let mut observations = Series::from_values("pm25", d(1), &[10.0, 12.0, 14.0, 16.0])
            .observations()
            .to_vec();
        observations.push(Observation::new(d(5)).with("no2", 1.0));
        let series = Series::new(observations);
        assert!(matches!(
            historical(&trained, &series, 2),
            Err(PipelineError::MissingFeature { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
