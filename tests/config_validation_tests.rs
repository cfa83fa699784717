//! Config Validation Tests
//!
//! Typo detection and range validation for `airq.toml`, exercised
//! independently from the rest of the pipeline.

use airq::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use airq::config::{AirqConfig, ConfigError};
use airq::types::Architecture;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_training_key_warns_with_suggestion() {
    let toml_str = r#"
[training]
learnig_rate = 0.01
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("learnig_rate"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("training.learning_rate"),
        "Should suggest the correct spelling"
    );
}

#[test]
fn typo_in_prediction_section_warns() {
    let toml_str = r#"
[prediction]
horizon_day = 3
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("prediction.horizon_days")
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[data]
store_path = "/var/lib/airq"
sample_city = "london"
sample_days = 365
seed = 1

[training]
architecture = "recurrent"
epochs = 30
batch_size = 16
learning_rate = 0.005
window_size = 14
validation_split = 0.1
seed = 9
target = "aqi"
features = ["pm25", "pm10", "no2"]

[prediction]
horizon_days = 5
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(
        warnings.is_empty(),
        "Valid config should produce 0 warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );

    let config = AirqConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.training.architecture, Architecture::Recurrent);
    assert_eq!(config.training.target.as_deref(), Some("aqi"));
    assert_eq!(config.data.sample_city, "london");
}

#[test]
fn unknown_section_warns() {
    let warnings = validate_unknown_keys("[model]\nlayers = 3\n");
    assert!(warnings.iter().any(|w| w.field == "model"));
    assert!(warnings.iter().any(|w| w.field == "model.layers"));
}

#[test]
fn multiple_typos_all_warned() {
    let toml_str = r#"
[training]
epoch = 10
window = 7

[data]
sample_dayz = 10
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 3, "{warnings:?}");
}

#[test]
fn unknown_keys_do_not_fail_loading() {
    let config = AirqConfig::from_toml_str("[training]\nepoch = 10\n").unwrap();
    assert_eq!(config, AirqConfig::default());
}

#[test]
fn empty_toml_produces_zero_warnings() {
    assert!(validate_unknown_keys("").is_empty());
}

#[test]
fn known_keys_set_is_complete() {
    let mut config = AirqConfig::default();
    config.data.seed = Some(3);
    config.training.target = Some("pm25".to_string());
    config.training.features = vec!["pm10".to_string()];
    let toml_str = config.to_toml().unwrap();
    let warnings = validate_unknown_keys(&toml_str);
    assert!(
        warnings.is_empty(),
        "Serialized config should produce 0 unknown-key warnings, got: {:?}",
        warnings.iter().map(|w| &w.field).collect::<Vec<_>>()
    );
}

#[test]
fn suggest_correction_returns_none_for_garbage() {
    let known = known_config_keys();
    assert!(suggest_correction("zzz_completely_invalid_xyz_12345", &known).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn all_defaults_pass_validation() {
    let (errors, warnings) = validate_ranges(&AirqConfig::default());
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn zero_batch_size_is_error() {
    let err = AirqConfig::from_toml_str("[training]\nbatch_size = 0\n").unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("batch_size"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn negative_learning_rate_is_error() {
    let err = AirqConfig::from_toml_str("[training]\nlearning_rate = -0.1\n").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("learning_rate"));
}

#[test]
fn huge_epoch_count_is_warning() {
    let mut config = AirqConfig::default();
    config.training.epochs = 50_000;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "training.epochs"));
}

#[test]
fn zero_horizon_is_warning() {
    let mut config = AirqConfig::default();
    config.prediction.horizon_days = 0;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.field == "prediction.horizon_days"));
}

#[test]
fn blank_feature_name_is_error() {
    let err = AirqConfig::from_toml_str("[training]\nfeatures = [\"pm10\", \" \"]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = AirqConfig::from_toml_str("[training\nepochs = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_, _)));
}
