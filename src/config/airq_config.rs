//! airq configuration: data location, training hyperparameters and
//! prediction horizon as TOML values.
//!
//! Every section implements `Default`, so an empty or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::types::{Architecture, ForecasterConfig};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "AIRQ_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "airq.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AirqConfig::load()` which searches:
/// 1. `$AIRQ_CONFIG` env var
/// 2. `./airq.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirqConfig {
    /// Storage and sample data
    #[serde(default)]
    pub data: DataConfig,

    /// Training hyperparameters and feature selection
    #[serde(default)]
    pub training: TrainingConfig,

    /// Prediction defaults
    #[serde(default)]
    pub prediction: PredictionConfig,
}

impl AirqConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AIRQ_CONFIG` environment variable
    /// 2. `./airq.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that fails to load is logged and skipped.
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {CONFIG_ENV}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV} points to non-existent file, falling back");
            }
        }

        // 2. Check ./airq.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged as warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate the configuration for internal consistency.
    ///
    /// Collects every error rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, range_warnings) = super::validation::validate_ranges(self);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// sled database directory
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// City used by `airq sample` (beijing, london, delhi, or anything else
    /// for the generic sample city)
    #[serde(default = "default_sample_city")]
    pub sample_city: String,

    /// Days generated per sample dataset
    #[serde(default = "default_sample_days")]
    pub sample_days: usize,

    /// Fixed seed for sample generation; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(defaults::STORE_PATH)
}
fn default_sample_city() -> String {
    defaults::SAMPLE_CITY.to_string()
}
fn default_sample_days() -> usize {
    crate::sample::DEFAULT_DAYS
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            sample_city: default_sample_city(),
            sample_days: default_sample_days(),
            seed: None,
        }
    }
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// dense, linear or recurrent
    #[serde(default)]
    pub architecture: Architecture,

    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// Observations per input window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Trailing share of pairs held out for validation
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,

    #[serde(default = "default_training_seed")]
    pub seed: u64,

    /// Target feature; the series default (pm25, then aqi) when unset
    #[serde(default)]
    pub target: Option<String>,

    /// Input features; every other available feature when empty
    #[serde(default)]
    pub features: Vec<String>,
}

fn default_epochs() -> usize {
    defaults::EPOCHS
}
fn default_batch_size() -> usize {
    defaults::BATCH_SIZE
}
fn default_learning_rate() -> f64 {
    defaults::LEARNING_RATE
}
fn default_window_size() -> usize {
    defaults::WINDOW_SIZE
}
fn default_validation_split() -> f64 {
    defaults::VALIDATION_SPLIT
}
fn default_training_seed() -> u64 {
    defaults::TRAINING_SEED
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::default(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            window_size: default_window_size(),
            validation_split: default_validation_split(),
            seed: default_training_seed(),
            target: None,
            features: Vec::new(),
        }
    }
}

impl TrainingConfig {
    /// Hyperparameters handed to the forecaster.
    pub fn forecaster_config(&self) -> ForecasterConfig {
        ForecasterConfig {
            architecture: self.architecture,
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            validation_split: self.validation_split,
            seed: self.seed,
        }
    }
}

// ============================================================================
// Prediction
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Steps for historical and future predictions
    #[serde(default = "default_horizon_days")]
    pub horizon_days: usize,
}

fn default_horizon_days() -> usize {
    defaults::HORIZON_DAYS
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
        }
    }
}
