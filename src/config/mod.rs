//! Configuration Module
//!
//! Data location, training hyperparameters and prediction defaults loaded
//! from TOML.
//!
//! ## Loading Order
//!
//! 1. `AIRQ_CONFIG` environment variable (path to TOML file)
//! 2. `airq.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(AirqConfig::load());
//!
//! // Anywhere in the codebase:
//! let window = config::get().training.window_size;
//! ```

mod airq_config;
pub mod defaults;
pub mod validation;

pub use airq_config::*;

use std::sync::OnceLock;

/// Global configuration, initialized once at startup.
static AIRQ_CONFIG: OnceLock<AirqConfig> = OnceLock::new();

/// Initialize the global configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: AirqConfig) {
    if AIRQ_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global configuration.
///
/// Falls back to built-in defaults if `init()` was never called.
pub fn get() -> &'static AirqConfig {
    AIRQ_CONFIG.get_or_init(AirqConfig::default)
}
