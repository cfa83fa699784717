//! Built-in default values.
//!
//! Grouped by config section.

// ============================================================================
// Data
// ============================================================================

/// sled directory for the CLI's persisted series and model.
pub const STORE_PATH: &str = "airq_data";

/// Sample dataset generated by `airq sample` when no city is given.
pub const SAMPLE_CITY: &str = "sample";

// ============================================================================
// Training
// ============================================================================

/// Observations per input window (one week of daily readings).
pub const WINDOW_SIZE: usize = 7;

/// Epochs per training run.
pub const EPOCHS: usize = 50;

pub const BATCH_SIZE: usize = 32;

/// Adam step size.
pub const LEARNING_RATE: f64 = 0.001;

/// Trailing share of pairs held out for validation (80/20 split).
pub const VALIDATION_SPLIT: f64 = 0.2;

/// Seed for weight initialization and shuffling.
pub const TRAINING_SEED: u64 = 42;

// ============================================================================
// Prediction
// ============================================================================

/// Days forecast / replayed when the CLI is not told otherwise.
pub const HORIZON_DAYS: usize = 7;
