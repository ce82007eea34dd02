// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime transport seam.
//!
//! Models a multiplexed pub/sub connection carrying logical topics
//! (one per account). Payloads cross this seam as raw JSON; typed decoding
//! belongs to the channel client layer above it.

use async_trait::async_trait;

use crate::error::HuddleError;

/// An event surfaced by the transport's receive side.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A server push on a joined topic.
    Push {
        topic: String,
        event: String,
        payload: serde_json::Value,
    },
    /// A transport-level error. Reported, never fatal to the subscription
    /// owner; the client decides whether to reconnect.
    Error(String),
    /// The underlying connection closed.
    Closed,
}

/// Bidirectional pub/sub transport over one shared connection.
///
/// Implementations must deliver pushes for a given topic in arrival order.
/// No cross-hop ordering is guaranteed; consumers re-sort by timestamp.
#[async_trait]
pub trait RealtimeTransport: Send + Sync + 'static {
    /// Open the underlying connection. Idempotent.
    async fn connect(&self) -> Result<(), HuddleError>;

    /// Join a logical topic. An `Err` here is a server-side join rejection
    /// and triggers the client's retry policy.
    async fn join(&self, topic: &str) -> Result<(), HuddleError>;

    /// Leave a previously joined topic. A leave for an unjoined topic is a
    /// no-op.
    async fn leave(&self, topic: &str) -> Result<(), HuddleError>;

    /// Close the connection. Must be safe to call multiple times.
    async fn close(&self) -> Result<(), HuddleError>;

    /// Push an event fire-and-forget.
    async fn push(
        &self,
        topic: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HuddleError>;

    /// Push an event and wait for the server acknowledgement payload.
    async fn push_with_ack(
        &self,
        topic: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, HuddleError>;

    /// Receive the next transport event. Resolves with [`TransportEvent::Closed`]
    /// once the connection is gone for good.
    async fn next_event(&self) -> Result<TransportEvent, HuddleError>;
}
