// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Huddle integration tests.
//!
//! Provides mock adapters and fixture builders for fast, deterministic,
//! CI-runnable tests without a live backend.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock realtime transport with event injection and push capture
//! - [`MockGateway`] - Mock REST gateway serving canned pages and scriptable failures
//! - [`fixtures`] - Conversation and message fixture builders

pub mod fixtures;
pub mod mock_gateway;
pub mod mock_transport;

pub use mock_gateway::{GatewayCall, MockGateway};
pub use mock_transport::{CapturedPush, MockTransport};
