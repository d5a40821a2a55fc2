//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use earshot_common::{AudioShape, ConfigError};
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_earshot_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r##"
[identity]
participant_id = "123456789012345678"

[session]
hub_url = "ws://10.0.0.2:8970"
reconnect = false
"##,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.identity.participant_id, "123456789012345678");
    assert_eq!(config.session.hub_url, "ws://10.0.0.2:8970");
    assert!(!config.session.reconnect);
    // Defaults preserved
    assert_eq!(config.session.connect_timeout, 10);
    assert_eq!(config.hub.port, 8970);
    assert_eq!(config.proximity.audio_shape, AudioShape::Volume);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_config_with_invalid_values_keeps_them() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[hub]
ping_interval = 1
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.hub.ping_interval, 1);
    assert!(crate::validation::validate(&config).is_err());
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("earshot").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.hub.port, 8970);
    assert_eq!(config.logging.level, crate::schema::LogLevel::Info);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::EarshotConfig;

    let config: EarshotConfig = toml::from_str(&default_config_toml()).unwrap();
    assert_eq!(config.session.hub_url, "ws://127.0.0.1:8970");
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn default_config_path_is_reasonable() {
    if let Ok(path) = default_config_path() {
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("earshot"));
        assert!(path_str.ends_with("config.toml"));
    }
}
