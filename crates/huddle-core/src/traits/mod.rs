// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait seams for the Huddle sync core.
//!
//! The engine never talks to a concrete socket or HTTP client; it receives
//! these traits by constructor injection so tests can run multiple isolated
//! instances concurrently. All traits use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod gateway;
pub mod transport;

pub use gateway::ConversationGateway;
pub use transport::{RealtimeTransport, TransportEvent};
