// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime channel client for the Huddle sync core.
//!
//! Maintains one account-scoped channel subscription over an injected
//! [`RealtimeTransport`](huddle_core::RealtimeTransport), decodes server
//! pushes into typed [`RealtimeEvent`]s, and carries the outbound
//! message-send and read-receipt pushes. Reconnection is supervised
//! internally: join rejections and dropped connections retry on a fixed
//! delay for the life of the client.

pub mod client;
pub mod event;
pub mod retry;

pub use client::{ChannelClient, SendOutcome};
pub use event::{decode_event, RealtimeEvent};
pub use retry::ErrorThrottle;
