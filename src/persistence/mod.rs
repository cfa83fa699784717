//! Key/value persistence for the series and the trained pipeline.
//!
//! Every value is one flat JSON text blob:
//!
//! | Key | Value |
//! |-----|-------|
//! | `air_quality_data` | [`SeriesSnapshot`] |
//! | `air_quality_model_info` | [`PipelineManifest`] |
//! | `air_quality_model_weights` | [`NetworkModel`] |
//!
//! Backends:
//! - `InMemoryStore`: tests and one-shot runs
//! - `SledStore`: on-disk, used by the CLI

mod memory;
mod sled_store;
mod snapshot;

pub use memory::InMemoryStore;
pub use sled_store::SledStore;
pub use snapshot::{PipelineManifest, SeriesSnapshot, MANIFEST_VERSION};

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::forecaster::NetworkModel;
use crate::pipeline::TrainedPipeline;
use crate::types::Series;

pub const DATA_KEY: &str = "air_quality_data";
pub const MODEL_INFO_KEY: &str = "air_quality_model_info";
pub const MODEL_WEIGHTS_KEY: &str = "air_quality_model_weights";

/// Pluggable string key/value backend.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

fn get_json<T: serde::de::DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    store
        .get(key)?
        .map(|text| serde_json::from_str(&text).map_err(PipelineError::from))
        .transpose()
}

fn put_json<T: serde::Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.put(key, &serde_json::to_string(value)?)
}

pub fn save_series(store: &dyn KeyValueStore, snapshot: &SeriesSnapshot) -> Result<()> {
    put_json(store, DATA_KEY, snapshot)?;
    info!(
        backend = store.backend_name(),
        source = %snapshot.source,
        observations = snapshot.data.len(),
        "Saved series"
    );
    Ok(())
}

pub fn load_series(store: &dyn KeyValueStore) -> Result<Option<SeriesSnapshot>> {
    let snapshot: Option<SeriesSnapshot> = get_json(store, DATA_KEY)?;
    // Re-sort in case the blob was edited by hand
    Ok(snapshot.map(|s| SeriesSnapshot {
        data: Series::new(s.data.observations().to_vec()),
        ..s
    }))
}

/// Store the manifest and, when the model has one, its network.
pub fn save_pipeline(store: &dyn KeyValueStore, trained: &TrainedPipeline) -> Result<()> {
    put_json(store, MODEL_INFO_KEY, &PipelineManifest::from_trained(trained))?;
    match trained.model.as_network() {
        Some(network) => put_json(store, MODEL_WEIGHTS_KEY, network)?,
        None => {
            warn!(
                architecture = %trained.model.architecture(),
                "Model has no serializable network; saving manifest only"
            );
            store.remove(MODEL_WEIGHTS_KEY)?;
        }
    }
    info!(backend = store.backend_name(), target = %trained.target, "Saved pipeline");
    Ok(())
}

/// Restore the saved pipeline; `None` when nothing is stored.
pub fn load_pipeline(store: &dyn KeyValueStore) -> Result<Option<TrainedPipeline>> {
    let Some(manifest) = get_json::<PipelineManifest>(store, MODEL_INFO_KEY)? else {
        return Ok(None);
    };
    if manifest.version != MANIFEST_VERSION {
        return Err(PipelineError::Storage(format!(
            "unsupported manifest version {} (expected {MANIFEST_VERSION})",
            manifest.version
        )));
    }

    let network: NetworkModel = get_json(store, MODEL_WEIGHTS_KEY)?
        .ok_or_else(|| PipelineError::Storage("model weights are missing".to_string()))?;
    if !network.accepts(manifest.window_size, manifest.features.len()) {
        return Err(PipelineError::Storage(format!(
            "saved weights do not fit a window of {} steps x {} features",
            manifest.window_size,
            manifest.features.len()
        )));
    }

    info!(
        backend = store.backend_name(),
        target = %manifest.target,
        architecture = %manifest.architecture,
        "Loaded pipeline"
    );
    Ok(Some(manifest.into_trained(Box::new(network))))
}

/// Forget the saved model.
pub fn clear_pipeline(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(MODEL_INFO_KEY)?;
    store.remove(MODEL_WEIGHTS_KEY)
}

/// Forget everything.
pub fn clear_all(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(DATA_KEY)?;
    clear_pipeline(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecaster::Model;
    use crate::normalizer::fit;
    use crate::types::{Architecture, ForecasterConfig, Window};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn series() -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        Series::from_values("pm25", start, &[10.0, 12.0, 14.0, 16.0])
    }

    fn trained(model: Box<dyn Model>) -> TrainedPipeline {
        let s = series();
        let stats = fit(&s, &["pm25"]).unwrap();
        TrainedPipeline::new(
            vec!["pm25".to_string()],
            "pm25".to_string(),
            2,
            stats,
            ForecasterConfig::default(),
            model,
        )
    }

    #[test]
    fn test_series_round_trip() {
        let store = InMemoryStore::new();
        assert!(load_series(&store).unwrap().is_none());
        save_series(&store, &SeriesSnapshot::new("sample:london", series())).unwrap();
        let back = load_series(&store).unwrap().unwrap();
        assert_eq!(back.source, "sample:london");
        assert_eq!(back.data, series());
    }

    #[test]
    fn test_pipeline_round_trip_keeps_predictions() {
        let store = InMemoryStore::new();
        let network = NetworkModel::new(Architecture::Dense, 2, 1, &mut StdRng::seed_from_u64(4));
        let original = trained(Box::new(network));
        save_pipeline(&store, &original).unwrap();

        let restored = load_pipeline(&store).unwrap().unwrap();
        assert_eq!(restored.target, "pm25");
        assert_eq!(restored.window_size, 2);
        let (a, b) = (restored.stats.get("pm25").unwrap(), original.stats.get("pm25").unwrap());
        assert!((a.mean - b.mean).abs() < 1e-12);
        assert!((a.std - b.std).abs() < 1e-12);

        let window = Window::new(vec![vec![0.3], vec![-0.8]]);
        assert!((restored.model.predict(&window) - original.model.predict(&window)).abs() < 1e-12);
    }

    #[test]
    fn test_mismatched_weights_rejected() {
        let store = InMemoryStore::new();
        let network = NetworkModel::new(Architecture::Linear, 5, 1, &mut StdRng::seed_from_u64(4));
        save_pipeline(&store, &trained(Box::new(network))).unwrap();
        assert!(matches!(load_pipeline(&store), Err(PipelineError::Storage(_))));
    }

    #[test]
    fn test_clear() {
        let store = InMemoryStore::new();
        save_series(&store, &SeriesSnapshot::new("x", series())).unwrap();
        let network = NetworkModel::new(Architecture::Linear, 2, 1, &mut StdRng::seed_from_u64(4));
        save_pipeline(&store, &trained(Box::new(network))).unwrap();

        clear_pipeline(&store).unwrap();
        assert!(load_pipeline(&store).unwrap().is_none());
        assert!(load_series(&store).unwrap().is_some());

        clear_all(&store).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_corrupt_blob_is_serialization_error() {
        let store = InMemoryStore::new();
        store.put(DATA_KEY, "not json").unwrap();
        assert!(matches!(load_series(&store), Err(PipelineError::Serialization(_))));
    }
}
