//! Configuration layering: defaults, TOML file, environment.

use std::env;
use std::io::Write;

use atlas_daq::config::AtlasConfig;
use atlas_daq::AtlasError;
use serial_test::serial;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let config = AtlasConfig::load_from("/nonexistent/atlas.toml").unwrap();
    assert_eq!(config, AtlasConfig::default());
}

#[test]
#[serial]
fn test_file_values_are_applied() {
    let file = write_config(
        r#"
[application]
log_level = "debug"
log_format = "json"

[instrument]
port = "/dev/ttyACM0"
digits = 1
"#,
    );

    let config = AtlasConfig::load_required(file.path()).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.log_format, "json");
    assert_eq!(config.application.name, "Atlas");
    assert_eq!(config.instrument.port.as_deref(), Some("/dev/ttyACM0"));
    assert_eq!(config.instrument.digits, 1);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = write_config("[instrument]\ndigits = 1\n");

    env::set_var("ATLAS_INSTRUMENT__DIGITS", "4");
    env::set_var("ATLAS_APPLICATION__LOG_LEVEL", "trace");
    let result = AtlasConfig::load_from(file.path());
    env::remove_var("ATLAS_INSTRUMENT__DIGITS");
    env::remove_var("ATLAS_APPLICATION__LOG_LEVEL");

    let config = result.unwrap();
    assert_eq!(config.instrument.digits, 4);
    assert_eq!(config.application.log_level, "trace");
}

#[test]
#[serial]
fn test_invalid_values_are_rejected_on_load() {
    let file = write_config("[instrument]\ndigits = 11\n");
    let err = AtlasConfig::load_from(file.path()).unwrap_err();
    assert!(matches!(err, AtlasError::Configuration(_)));
    assert!(err.to_string().contains("digits"));
}

#[test]
#[serial]
fn test_malformed_toml_is_a_config_error() {
    let file = write_config("[instrument\ndigits = ");
    let err = AtlasConfig::load_from(file.path()).unwrap_err();
    assert!(matches!(err, AtlasError::Config(_)));
}
