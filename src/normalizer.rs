//! Z-score feature normalization.
//!
//! Statistics are fitted once over the whole series (arithmetic mean and
//! population standard deviation, dividing by N) and then applied or
//! reversed per feature. A zero-variance feature scales by 1, so values
//! equal to its mean normalize to 0 and denormalization is a pure shift.

use std::collections::BTreeMap;

use statrs::statistics::Statistics;

use crate::error::{PipelineError, Result};
use crate::types::{FeatureStat, FeatureStats, Observation, Series};

/// Compute mean and population std for each of `features` over `series`.
pub fn fit<S: AsRef<str>>(series: &Series, features: &[S]) -> Result<FeatureStats> {
    if series.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let mut stats = FeatureStats::new();
    for feature in features {
        let feature = feature.as_ref();
        if stats.contains(feature) {
            continue;
        }
        let values = series.values(feature)?;
        let mean = values.iter().mean();
        let std = values.iter().population_std_dev();
        stats.insert(feature, FeatureStat { mean, std });
    }

    tracing::debug!(
        features = stats.len(),
        observations = series.len(),
        "Fitted feature statistics"
    );
    Ok(stats)
}

/// Normalize every feature of `observation` that has statistics.
pub fn normalize(observation: &Observation, stats: &FeatureStats) -> BTreeMap<String, f64> {
    stats
        .iter()
        .filter_map(|(feature, stat)| {
            observation
                .get(feature)
                .map(|v| (feature.clone(), (v - stat.mean) / stat.scale()))
        })
        .collect()
}

/// Normalize one raw value of `feature`.
pub fn normalize_value(value: f64, feature: &str, stats: &FeatureStats) -> Result<f64> {
    let stat = stats.require(feature)?;
    Ok((value - stat.mean) / stat.scale())
}

/// Map a normalized scalar back to `feature`'s raw units.
pub fn denormalize(scalar: f64, feature: &str, stats: &FeatureStats) -> Result<f64> {
    let stat = stats.require(feature)?;
    Ok(scalar * stat.scale() + stat.mean)
}

/// Normalized feature vector of `observation`, in `features` order.
pub fn feature_vector<S: AsRef<str>>(
    observation: &Observation,
    features: &[S],
    stats: &FeatureStats,
) -> Result<Vec<f64>> {
    features
        .iter()
        .map(|f| {
            let f = f.as_ref();
            normalize_value(observation.require(f)?, f, stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Series::from_values("pm25", start, values)
    }

    #[test]
    fn test_fit_uses_population_std() {
        let stats = fit(&series(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), &["pm25"]).unwrap();
        let stat = stats.get("pm25").unwrap();
        assert!((stat.mean - 5.0).abs() < 1e-12);
        // Population std of this classic sample is exactly 2 (sample std would be ~2.138)
        assert!((stat.std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_empty_series_fails() {
        let err = fit(&Series::default(), &["pm25"]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_fit_missing_feature_fails() {
        let err = fit(&series(&[1.0, 2.0]), &["no2"]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingFeature { .. }));
    }

    #[test]
    fn test_round_trip() {
        let stats = fit(&series(&[10.0, 12.0, 14.0, 16.0, 18.0, 20.0]), &["pm25"]).unwrap();
        for x in [-250.0, -1.5, 0.0, 13.0, 15.0, 1e6] {
            let n = normalize_value(x, "pm25", &stats).unwrap();
            let back = denormalize(n, "pm25", &stats).unwrap();
            assert!((back - x).abs() < 1e-9 * x.abs().max(1.0), "{x} -> {n} -> {back}");
        }
    }

    #[test]
    fn test_degenerate_std() {
        let stats = fit(&series(&[7.0, 7.0, 7.0]), &["pm25"]).unwrap();
        assert_eq!(stats.get("pm25").unwrap().std, 0.0);
        assert_eq!(normalize_value(7.0, "pm25", &stats).unwrap(), 0.0);
        // Identity shifted by the mean
        assert_eq!(denormalize(0.0, "pm25", &stats).unwrap(), 7.0);
        assert_eq!(denormalize(2.5, "pm25", &stats).unwrap(), 9.5);
    }

    #[test]
    fn test_normalize_observation_skips_unknown_features() {
        let stats = fit(&series(&[1.0, 3.0]), &["pm25"]).unwrap();
        let obs = Observation::new(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
            .with("pm25", 3.0)
            .with("no2", 99.0);
        let normalized = normalize(&obs, &stats);
        assert_eq!(normalized.len(), 1);
        assert!((normalized["pm25"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_denormalize_missing_stats() {
        let stats = FeatureStats::new();
        let err = denormalize(1.0, "aqi", &stats).unwrap_err();
        assert!(matches!(err, PipelineError::MissingStats { .. }));
    }
}
