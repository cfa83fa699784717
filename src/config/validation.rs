//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use crate::types::MAX_EPOCHS;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for AirqConfig.
///
/// Maintained by hand to match the structs in airq_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [data]
        "data",
        "data.store_path",
        "data.sample_city",
        "data.sample_days",
        "data.seed",
        // [training]
        "training",
        "training.architecture",
        "training.epochs",
        "training.batch_size",
        "training.learning_rate",
        "training.window_size",
        "training.validation_split",
        "training.seed",
        "training.target",
        "training.features",
        // [prediction]
        "prediction",
        "prediction.horizon_days",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties go to the alphabetically first key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed AirqConfig.
///
/// Returns (errors, warnings): errors are values the pipeline cannot run
/// with; warnings are legal but unusual.
pub fn validate_ranges(config: &super::AirqConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let t = &config.training;

    if t.epochs == 0 {
        errors.push("training.epochs must be > 0".to_string());
    } else if t.epochs > MAX_EPOCHS {
        errors.push(format!("training.epochs = {} exceeds {MAX_EPOCHS}", t.epochs));
    } else if t.epochs > 10_000 {
        warnings.push(ValidationWarning {
            field: "training.epochs".to_string(),
            message: format!("training.epochs = {} will take a long time", t.epochs),
            suggestion: None,
        });
    }

    if t.batch_size == 0 {
        errors.push("training.batch_size must be > 0".to_string());
    }

    if t.window_size == 0 {
        errors.push("training.window_size must be > 0".to_string());
    }

    if !t.learning_rate.is_finite() || t.learning_rate <= 0.0 {
        errors.push(format!(
            "training.learning_rate = {} must be a positive finite number",
            t.learning_rate
        ));
    } else if t.learning_rate > 0.5 {
        warnings.push(ValidationWarning {
            field: "training.learning_rate".to_string(),
            message: format!(
                "training.learning_rate = {} is unusually high for Adam",
                t.learning_rate
            ),
            suggestion: None,
        });
    }

    // NaN fails both comparisons
    if !(t.validation_split >= 0.0 && t.validation_split < 1.0) {
        errors.push(format!(
            "training.validation_split = {} must be in [0, 1)",
            t.validation_split
        ));
    }

    if t.features.iter().any(|f| f.trim().is_empty()) {
        errors.push("training.features contains an empty name".to_string());
    }
    if t.target.as_deref().is_some_and(|f| f.trim().is_empty()) {
        errors.push("training.target is empty".to_string());
    }

    if config.data.sample_days == 0 {
        errors.push("data.sample_days must be > 0".to_string());
    } else if config.data.sample_days <= t.window_size {
        warnings.push(ValidationWarning {
            field: "data.sample_days".to_string(),
            message: format!(
                "data.sample_days = {} leaves no training pairs for window_size = {}",
                config.data.sample_days, t.window_size
            ),
            suggestion: None,
        });
    }

    if config.prediction.horizon_days == 0 {
        warnings.push(ValidationWarning {
            field: "prediction.horizon_days".to_string(),
            message: "prediction.horizon_days = 0 produces empty predictions".to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}
