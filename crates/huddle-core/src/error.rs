// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Huddle conversation sync core.

use thiserror::Error;

/// The primary error type used across Huddle adapter traits and core operations.
#[derive(Debug, Error)]
pub enum HuddleError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Realtime transport errors (connection drop, push failure, socket close).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// REST gateway errors (request failure, unexpected payload shape).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The server rejected a channel join handshake.
    #[error("join rejected for topic `{topic}`: {reason}")]
    JoinRejected { topic: String, reason: String },

    /// A realtime payload could not be decoded into its typed event.
    #[error("failed to decode `{event}` payload")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// A user-initiated action failed local validation before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors (engine torn down, channel closed).
    #[error("internal error: {0}")]
    Internal(String),
}

impl HuddleError {
    /// Convenience constructor for transport errors without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Convenience constructor for gateway errors without an underlying source.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            source: None,
        }
    }
}
