//! Serialized forms of a series and of a trained pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::forecaster::Model;
use crate::pipeline::TrainedPipeline;
use crate::types::{
    Architecture, Evaluation, FeatureStats, ForecasterConfig, Series, TrainingProgress,
};

/// Manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// A stored series and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSnapshot {
    /// Free-form origin label, e.g. `sample:london` or a file name.
    pub source: String,
    pub data: Series,
    pub timestamp: DateTime<Utc>,
}

impl SeriesSnapshot {
    pub fn new(source: impl Into<String>, data: Series) -> Self {
        Self {
            source: source.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Everything about a trained pipeline except the network weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineManifest {
    pub version: u32,
    pub target: String,
    pub features: Vec<String>,
    pub window_size: usize,
    pub stats: FeatureStats,
    pub architecture: Architecture,
    pub config: ForecasterConfig,
    #[serde(default)]
    pub history: Vec<TrainingProgress>,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineManifest {
    pub fn from_trained(trained: &TrainedPipeline) -> Self {
        Self {
            version: MANIFEST_VERSION,
            target: trained.target.clone(),
            features: trained.features.clone(),
            window_size: trained.window_size,
            stats: trained.stats.clone(),
            architecture: trained.model.architecture(),
            config: trained.config.clone(),
            history: trained.history.clone(),
            evaluation: trained.evaluation,
            timestamp: trained.trained_at,
        }
    }

    /// Reassemble a pipeline around a restored model.
    pub fn into_trained(self, model: Box<dyn Model>) -> TrainedPipeline {
        TrainedPipeline {
            features: self.features,
            target: self.target,
            window_size: self.window_size,
            stats: self.stats,
            config: self.config,
            model,
            history: self.history,
            evaluation: self.evaluation,
            trained_at: self.timestamp,
        }
    }
}
