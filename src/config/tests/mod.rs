//! Unit tests for config module
//!
//! Tests configuration types, defaults, and validation.
//! No filesystem dependencies - all in-memory.

#![allow(clippy::panic)]

use std::time::Duration;

use crate::config::{ClientConfig, ConfigError, LogLevel, UnsupportedPolicy};

#[test]
fn config_default() {
    let config = ClientConfig::default();

    assert_eq!(config.tick_interval(), Duration::from_millis(500));
    assert_eq!(config.resync_interval(), Duration::from_secs(5));
    assert_eq!(config.bind_timeout(), Duration::from_secs(3));
    assert_eq!(config.discovery_timeout(), Duration::from_secs(2));
    assert!(!config.strict_mode);
    assert!(config.auto_reconnect);
    assert_eq!(config.unsupported_policy, UnsupportedPolicy::Ignore);
    assert_eq!(config.log_level, LogLevel::Info);
}

#[test]
fn config_empty_toml() {
    let Ok(config) = ClientConfig::from_toml_str("") else {
        panic!("empty config should parse");
    };

    assert_eq!(config, ClientConfig::default());
}

#[test]
fn config_deserialize_toml() {
    let toml_str = r#"
        preferred_player = "vlc"
        ignored_players = ["kdeconnect", "chromium"]
        strict_mode = true
        unsupported_policy = "reject"
        tick_interval_ms = 250
        log_level = "debug"
    "#;

    let Ok(config) = ClientConfig::from_toml_str(toml_str) else {
        panic!("config should parse");
    };

    assert_eq!(config.preferred_player.as_deref(), Some("vlc"));
    assert_eq!(config.ignored_players, ["kdeconnect", "chromium"]);
    assert!(config.strict_mode);
    assert_eq!(config.unsupported_policy, UnsupportedPolicy::Reject);
    assert_eq!(config.tick_interval(), Duration::from_millis(250));
    assert_eq!(config.resync_interval_ms, 5_000);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn config_serialize_toml() {
    let config = ClientConfig {
        unsupported_policy: UnsupportedPolicy::Reject,
        ..ClientConfig::default()
    };

    let Ok(toml_str) = toml::to_string(&config) else {
        panic!("config should serialize");
    };

    assert!(toml_str.contains("unsupported_policy = \"reject\""));
    assert!(toml_str.contains("tick_interval_ms = 500"));
}

#[test]
fn zero_interval_is_rejected() {
    let result = ClientConfig::from_toml_str("resync_interval_ms = 0");

    match result {
        Err(ConfigError::InvalidConfigField { field, .. }) => {
            assert_eq!(field, "resync_interval_ms");
        }
        other => panic!("expected invalid field, got {other:?}"),
    }
}

#[test]
fn blank_preferred_player_is_rejected() {
    assert!(matches!(
        ClientConfig::from_toml_str("preferred_player = \"  \""),
        Err(ConfigError::InvalidConfigField { .. })
    ));
}

#[test]
fn invalid_toml_reports_parse_error() {
    assert!(matches!(
        ClientConfig::from_toml_str("strict_mode = maybe"),
        Err(ConfigError::TomlParseError { .. })
    ));
}

#[test]
fn log_level_display_matches_serde() {
    assert_eq!(LogLevel::Warn.to_string(), "warn");
    assert_eq!(LogLevel::Trace.to_string(), "trace");
}
