//! Sliding-window construction for supervised training and forecasting.

use crate::error::{PipelineError, Result};
use crate::normalizer::{feature_vector, normalize_value};
use crate::types::{FeatureStats, Series, TrainingSet, Window};

fn check_length(series: &Series, window_size: usize) -> Result<()> {
    if window_size == 0 {
        return Err(PipelineError::InvalidConfig("window_size must be > 0".to_string()));
    }
    if series.len() <= window_size {
        return Err(PipelineError::InsufficientData {
            needed: window_size + 1,
            available: series.len(),
        });
    }
    Ok(())
}

/// Normalized window over observations `[start, start + window_size)`.
pub(crate) fn window_at<S: AsRef<str>>(
    series: &Series,
    features: &[S],
    start: usize,
    window_size: usize,
    stats: &FeatureStats,
) -> Result<Window> {
    let steps = series.observations()[start..start + window_size]
        .iter()
        .map(|obs| feature_vector(obs, features, stats))
        .collect::<Result<Vec<_>>>()?;
    Ok(Window::new(steps))
}

/// Every `(window, label)` pair of a series: window `[i, i+w)` over
/// `features`, labelled with the normalized `target` at `i+w`.
///
/// A series of length `N` yields exactly `N - w` pairs, ordered by start
/// index. Fails with `InsufficientData` when `N <= w`.
pub fn build_training_set<S: AsRef<str>>(
    series: &Series,
    features: &[S],
    target: &str,
    window_size: usize,
    stats: &FeatureStats,
) -> Result<TrainingSet> {
    check_length(series, window_size)?;

    let count = series.len() - window_size;
    let mut windows = Vec::with_capacity(count);
    let mut labels = Vec::with_capacity(count);

    for i in 0..count {
        windows.push(window_at(series, features, i, window_size, stats)?);
        let label_obs = &series.observations()[i + window_size];
        labels.push(normalize_value(label_obs.require(target)?, target, stats)?);
    }

    tracing::debug!(pairs = count, window_size, "Built training set");
    TrainingSet::new(windows, labels)
}

/// The last `window_size` observations, used to seed forward forecasts.
///
/// Fails under the same condition as [`build_training_set`].
pub fn trailing_window<S: AsRef<str>>(
    series: &Series,
    features: &[S],
    window_size: usize,
    stats: &FeatureStats,
) -> Result<Window> {
    check_length(series, window_size)?;
    window_at(series, features, series.len() - window_size, window_size, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{denormalize, fit};
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Series::from_values("pm25", start, values)
    }

    fn raw(window: &Window, stats: &FeatureStats) -> Vec<f64> {
        window
            .flatten()
            .iter()
            .map(|&v| denormalize(v, "pm25", stats).unwrap())
            .collect()
    }

    #[test]
    fn test_cardinality_is_n_minus_w() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let stats = fit(&s, &["pm25"]).unwrap();
        for w in 1..7 {
            let set = build_training_set(&s, &["pm25"], "pm25", w, &stats).unwrap();
            assert_eq!(set.len(), 7 - w);
            assert!(set.windows.iter().all(|win| win.len() == w));
        }
    }

    #[test]
    fn test_too_short_series_fails() {
        let s = series(&[1.0, 2.0, 3.0]);
        let stats = fit(&s, &["pm25"]).unwrap();
        for w in [3, 4] {
            match build_training_set(&s, &["pm25"], "pm25", w, &stats) {
                Err(PipelineError::InsufficientData { needed, available }) => {
                    assert_eq!(needed, w + 1);
                    assert_eq!(available, 3);
                }
                other => panic!("expected InsufficientData, got {other:?}"),
            }
            assert!(trailing_window(&s, &["pm25"], w, &stats).is_err());
        }
    }

    #[test]
    fn test_zero_window_is_invalid() {
        let s = series(&[1.0, 2.0]);
        let stats = fit(&s, &["pm25"]).unwrap();
        let err = build_training_set(&s, &["pm25"], "pm25", 0, &stats).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn test_pairs_follow_start_index() {
        let s = series(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0]);
        let stats = fit(&s, &["pm25"]).unwrap();
        let set = build_training_set(&s, &["pm25"], "pm25", 2, &stats).unwrap();

        let expected = [
            (vec![10.0, 12.0], 14.0),
            (vec![12.0, 14.0], 16.0),
            (vec![14.0, 16.0], 18.0),
            (vec![16.0, 18.0], 20.0),
        ];
        assert_eq!(set.len(), expected.len());
        for ((window, label), (want_window, want_label)) in
            set.windows.iter().zip(&set.labels).zip(expected.iter())
        {
            let got = raw(window, &stats);
            for (g, w) in got.iter().zip(want_window) {
                assert!((g - w).abs() < 1e-9);
            }
            let got_label = denormalize(*label, "pm25", &stats).unwrap();
            assert!((got_label - want_label).abs() < 1e-9);
        }
    }

    #[test]
    fn test_trailing_window_is_last_w() {
        let s = series(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0]);
        let stats = fit(&s, &["pm25"]).unwrap();
        let window = trailing_window(&s, &["pm25"], 3, &stats).unwrap();
        let got = raw(&window, &stats);
        for (g, w) in got.iter().zip([16.0, 18.0, 20.0]) {
            assert!((g - w).abs() < 1e-9);
        }
    }

    #[test]
    fn test_multi_feature_steps_follow_feature_order() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = (0..4)
            .map(|i| {
                crate::types::Observation::new(start + chrono::Days::new(i))
                    .with("pm10", f64::from(i as u32))
                    .with("no2", 100.0)
                    .with("pm25", f64::from(i as u32) * 2.0)
            })
            .collect();
        let s = Series::new(obs);
        let stats = fit(&s, &["pm10", "no2", "pm25"]).unwrap();
        let set = build_training_set(&s, &["pm10", "no2"], "pm25", 1, &stats).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.windows[0].num_features(), 2);
        // no2 is constant: zero std, normalizes to 0
        assert_eq!(set.windows[0].steps()[0][1], 0.0);
    }
}
