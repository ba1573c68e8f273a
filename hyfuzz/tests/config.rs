use hyfuzz::error::ConfigError;
use hyfuzz::prelude::*;

#[test]
fn defaults_match_the_reference_scenario() {
    let config = FuzzConfig::default();
    assert_eq!(config.seed, 12345);
    assert_eq!(config.max_depth, 3);
    assert_eq!(config.target, ValueType::Bool);
    assert_eq!(
        config.root_types,
        vec![
            ValueType::String,
            ValueType::String,
            ValueType::Int,
            ValueType::Int,
            ValueType::Bool,
            ValueType::Bool
        ]
    );
    assert_eq!(config.constant_operand_odds, 3);
    config.validate().unwrap();
}

#[test]
fn partial_toml_keeps_defaults() {
    let config = FuzzConfig::from_toml_str(
        r#"
        seed = 7
        iterations = 10
        root_types = ["int", "date_time"]
        "#,
    )
    .unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.iterations, 10);
    assert_eq!(config.root_types, vec![ValueType::Int, ValueType::DateTime]);
    assert_eq!(config.max_depth, 3);
    assert_eq!(config.shape, QueryShape::Filter);
}

#[test]
fn toml_round_trip() {
    let config = FuzzConfig {
        shape: QueryShape::Project,
        target: ValueType::Int,
        ..FuzzConfig::default()
    };
    let text = config.to_toml_string().unwrap();
    assert!(text.contains("shape = \"project\""));
    assert_eq!(FuzzConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn invalid_settings_are_rejected() {
    let err = FuzzConfig::from_toml_str("constant_operand_odds = 0").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidSetting {
            setting: "constant_operand_odds",
            ..
        }
    ));

    let err = FuzzConfig::from_toml_str("root_types = []").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidSetting {
            setting: "root_types",
            ..
        }
    ));

    let err = FuzzConfig::from_toml_str("target = \"int\"\nshape = \"filter\"").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidSetting {
            setting: "target",
            ..
        }
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(FuzzConfig::from_toml_str("seed = \"twelve\"").unwrap_err().is_parse());
    assert!(FuzzConfig::from_toml_str("colour = 1").unwrap_err().is_parse());
    assert!(FuzzConfig::from_toml_str("target = \"float\"").unwrap_err().is_parse());
}

#[test]
fn missing_files_are_io_errors() {
    let err = FuzzConfig::from_file("/nonexistent/hyfuzz.toml").unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().contains("/nonexistent/hyfuzz.toml"));
}
