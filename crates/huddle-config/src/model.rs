// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Huddle sync core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Huddle configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HuddleConfig {
    /// REST API endpoint and credentials.
    #[serde(default)]
    pub api: ApiConfig,

    /// Realtime channel reconnect policy.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Conversation store coalescing and pagination settings.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Notification and sound policy settings.
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the product REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for authenticated requests.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}

/// Realtime channel reconnect policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// Fixed delay before retrying a rejected channel join, in seconds.
    #[serde(default = "default_join_retry_secs")]
    pub join_retry_secs: u64,

    /// Transport errors are reported at most once per this window, in seconds.
    #[serde(default = "default_error_window_secs")]
    pub error_window_secs: u64,
}

impl RealtimeConfig {
    pub fn join_retry(&self) -> Duration {
        Duration::from_secs(self.join_retry_secs)
    }

    pub fn error_window(&self) -> Duration {
        Duration::from_secs(self.error_window_secs)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            join_retry_secs: default_join_retry_secs(),
            error_window_secs: default_error_window_secs(),
        }
    }
}

fn default_join_retry_secs() -> u64 {
    10
}

fn default_error_window_secs() -> u64 {
    30
}

/// Conversation store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Coalescing window for bursty realtime events, in milliseconds.
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,

    /// UI hold before a closed conversation leaves the list, in milliseconds.
    #[serde(default = "default_closing_hold_ms")]
    pub closing_hold_ms: u64,

    /// Page size for conversation listings.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl SyncConfig {
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_ms)
    }

    pub fn closing_hold(&self) -> Duration {
        Duration::from_millis(self.closing_hold_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            coalesce_ms: default_coalesce_ms(),
            closing_hold_ms: default_closing_hold_ms(),
            page_size: default_page_size(),
        }
    }
}

fn default_coalesce_ms() -> u64 {
    400
}

fn default_closing_hold_ms() -> u64 {
    400
}

fn default_page_size() -> usize {
    50
}

/// Notification and sound policy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AlertConfig {
    /// Trailing-disabled window for the notification sound, in seconds.
    #[serde(default = "default_sound_window_secs")]
    pub sound_window_secs: u64,

    /// Volume for a conversation's first-ever message.
    #[serde(default = "default_first_message_volume")]
    pub first_message_volume: f32,

    /// Volume for follow-up messages.
    #[serde(default = "default_follow_up_volume")]
    pub follow_up_volume: f32,
}

impl AlertConfig {
    pub fn sound_window(&self) -> Duration {
        Duration::from_secs(self.sound_window_secs)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_window_secs: default_sound_window_secs(),
            first_message_volume: default_first_message_volume(),
            follow_up_volume: default_follow_up_volume(),
        }
    }
}

fn default_sound_window_secs() -> u64 {
    10
}

fn default_first_message_volume() -> f32 {
    0.2
}

fn default_follow_up_volume() -> f32 {
    0.1
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
