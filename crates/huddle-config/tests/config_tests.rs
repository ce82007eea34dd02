// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Huddle configuration system.

use huddle_config::diagnostic::{suggest_key, ConfigError};
use huddle_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_huddle_config() {
    let toml = r#"
[api]
base_url = "https://app.example.com"
token = "tok-123"

[realtime]
join_retry_secs = 5
error_window_secs = 60

[sync]
coalesce_ms = 250
closing_hold_ms = 300
page_size = 25

[alerts]
sound_window_secs = 15
first_message_volume = 0.3
follow_up_volume = 0.05

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.api.base_url, "https://app.example.com");
    assert_eq!(config.api.token.as_deref(), Some("tok-123"));
    assert_eq!(config.realtime.join_retry_secs, 5);
    assert_eq!(config.realtime.error_window_secs, 60);
    assert_eq!(config.sync.coalesce_ms, 250);
    assert_eq!(config.sync.closing_hold_ms, 300);
    assert_eq!(config.sync.page_size, 25);
    assert_eq!(config.alerts.sound_window_secs, 15);
    assert_eq!(config.alerts.first_message_volume, 0.3);
    assert_eq!(config.log.level, "debug");
}

/// Empty TOML falls back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should deserialize");
    assert_eq!(config.sync.coalesce_ms, 400);
    assert_eq!(config.realtime.join_retry_secs, 10);
    assert_eq!(config.alerts.sound_window_secs, 10);
}

/// Unknown field in a section produces an error mentioning the bad key.
#[test]
fn unknown_field_in_sync_produces_error() {
    let toml = r#"
[sync]
coalese_ms = 200
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("coalese_ms"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// load_and_validate_str surfaces validation errors as diagnostics.
#[test]
fn validation_errors_surface_as_diagnostics() {
    let toml = r#"
[alerts]
first_message_volume = 2.0
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("first_message_volume"))));
}

/// load_and_validate_str converts unknown-key errors with suggestions.
#[test]
fn unknown_key_gets_a_suggestion() {
    let toml = r#"
[api]
base_ur = "https://app.example.com"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail on unknown key");
    let has_suggestion = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey {
                key,
                suggestion: Some(s),
                ..
            } if key == "base_ur" && s == "base_url"
        )
    });
    assert!(has_suggestion, "expected base_ur -> base_url suggestion, got: {errors:?}");
}

/// Config can be loaded from an explicit file path.
#[test]
fn load_from_explicit_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("huddle.toml");
    std::fs::write(&path, "[sync]\npage_size = 10\n").expect("write config");

    let config = load_config_from_path(&path).expect("should load from path");
    assert_eq!(config.sync.page_size, 10);
    // Untouched sections keep their defaults.
    assert_eq!(config.sync.coalesce_ms, 400);
}

/// The fuzzy matcher does not invent suggestions for distant typos.
#[test]
fn suggest_key_threshold_filters_noise() {
    assert_eq!(suggest_key("qqqq", &["coalesce_ms", "page_size"]), None);
}
