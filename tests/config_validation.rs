#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Configuration parsing and validation tests.

use gamewire::config::{NetConfig, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use gamewire::WireError;

#[test]
fn defaults_are_valid() {
    let config = NetConfig::default();
    let errors = config.validate();
    assert!(errors.is_empty(), "default config invalid: {errors:?}");
    config.validate_strict().expect("strict validation");

    assert_eq!(config.server.version, PROTOCOL_VERSION);
    assert_eq!(config.client.version, PROTOCOL_VERSION);
    assert_eq!(config.transport.max_payload_size, MAX_PAYLOAD_SIZE);
}

#[test]
fn toml_round_trip() {
    let toml = r#"
        [server]
        address = "0.0.0.0:7777"
        version = 2.5

        [client]
        address = "10.0.0.1:7777"
        version = 2.5

        [transport]
        max_payload_size = 1048576
    "#;

    let config = NetConfig::from_toml(toml).expect("parse");
    assert_eq!(config.server.address, "0.0.0.0:7777");
    assert_eq!(config.client.address, "10.0.0.1:7777");
    assert_eq!(config.server.version, 2.5);
    assert_eq!(config.transport.max_payload_size, 1024 * 1024);
    assert!(config.validate().is_empty());
}

#[test]
fn partial_toml_fills_defaults() {
    let config = NetConfig::from_toml(
        r#"
        [server]
        address = "0.0.0.0:9000"
        version = 1.0
    "#,
    )
    .expect("parse");

    assert_eq!(config.server.address, "0.0.0.0:9000");
    assert_eq!(config.client.address, "127.0.0.1:60000");
    assert_eq!(config.transport.max_payload_size, MAX_PAYLOAD_SIZE);
}

#[test]
fn malformed_toml_is_a_config_error() {
    let result = NetConfig::from_toml("this is not toml = [");
    assert!(matches!(result, Err(WireError::ConfigError(_))));
}

#[test]
fn bad_addresses_are_flagged() {
    let mut config = NetConfig::default();
    config.server.address = "not-an-address".into();
    config.client.address = String::new();

    let errors = config.validate();
    assert_eq!(errors.len(), 2, "unexpected errors: {errors:?}");
    assert!(errors[0].contains("server address"));
    assert!(errors[1].contains("client address"));
    assert!(config.validate_strict().is_err());
}

#[test]
fn nonpositive_versions_are_flagged() {
    let mut config = NetConfig::default();
    config.server.version = 0.0;
    config.client.version = -1.0;

    let errors = config.validate();
    assert_eq!(errors.len(), 2, "unexpected errors: {errors:?}");
}

#[test]
fn payload_bounds_are_flagged() {
    let mut config = NetConfig::default();
    config.transport.max_payload_size = 0;
    assert_eq!(config.validate().len(), 1);

    config.transport.max_payload_size = 200 * 1024 * 1024;
    assert_eq!(config.validate().len(), 1);

    config.transport.max_payload_size = 4096;
    assert!(config.validate().is_empty());
}

#[test]
fn missing_file_is_a_config_error() {
    let result = NetConfig::from_file("/nonexistent/gamewire.toml");
    assert!(matches!(result, Err(WireError::ConfigError(_))));
}
