//! Per-feature z-score statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Mean and population standard deviation of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStat {
    pub mean: f64,
    pub std: f64,
}

impl FeatureStat {
    /// Divisor used for scaling. A zero-variance feature scales by 1.
    pub fn scale(&self) -> f64 {
        if self.std == 0.0 {
            1.0
        } else {
            self.std
        }
    }
}

/// Statistics for a fixed feature set, computed once per training run and
/// shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureStats {
    features: BTreeMap<String, FeatureStat>,
}

impl FeatureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<String>, stat: FeatureStat) {
        self.features.insert(feature.into(), stat);
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureStat> {
        self.features.get(feature)
    }

    /// Stat for `feature`, or `MissingStats`.
    pub fn require(&self, feature: &str) -> Result<&FeatureStat> {
        self.get(feature).ok_or_else(|| PipelineError::MissingStats {
            feature: feature.to_string(),
        })
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.features.contains_key(feature)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureStat)> {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_std_scales_by_one() {
        let stat = FeatureStat { mean: 4.0, std: 0.0 };
        assert_eq!(stat.scale(), 1.0);
        let stat = FeatureStat { mean: 4.0, std: 2.5 };
        assert_eq!(stat.scale(), 2.5);
    }

    #[test]
    fn test_require_reports_missing_feature() {
        let mut stats = FeatureStats::new();
        stats.insert("pm25", FeatureStat { mean: 1.0, std: 1.0 });
        assert!(stats.require("pm25").is_ok());
        match stats.require("no2") {
            Err(PipelineError::MissingStats { feature }) => assert_eq!(feature, "no2"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let mut stats = FeatureStats::new();
        stats.insert("aqi", FeatureStat { mean: 50.0, std: 10.0 });
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"aqi":{"mean":50.0,"std":10.0}}"#);
    }
}
