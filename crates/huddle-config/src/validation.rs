// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty URLs, volume ranges, and non-zero windows.

use crate::diagnostic::ConfigError;
use crate::model::HuddleConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HuddleConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "api.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("api.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if config.sync.coalesce_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.coalesce_ms must be greater than zero".to_string(),
        });
    }

    if config.sync.page_size == 0 {
        errors.push(ConfigError::Validation {
            message: "sync.page_size must be greater than zero".to_string(),
        });
    }

    if config.realtime.join_retry_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.join_retry_secs must be greater than zero".to_string(),
        });
    }

    for (name, volume) in [
        ("alerts.first_message_volume", config.alerts.first_message_volume),
        ("alerts.follow_up_volume", config.alerts.follow_up_volume),
    ] {
        if !(0.0..=1.0).contains(&volume) {
            errors.push(ConfigError::Validation {
                message: format!("{name} must be within 0.0..=1.0, got {volume}"),
            });
        }
    }

    const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    if !LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level must be one of {}, got `{}`",
                LEVELS.join(", "),
                config.log.level
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
