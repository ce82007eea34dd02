// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation synchronization for the Huddle dashboard.
//!
//! The [`ConversationStore`] holds the normalized conversation and message
//! maps; the [`SyncEngine`] actor is its single writer, reconciling REST
//! fetches with realtime pushes and exposing snapshots plus store events to
//! the UI layer. Supporting modules cover inbox-bucket derivation, the
//! keyed coalescing window, selection navigation, and the notification
//! sound policy.

pub mod alerts;
pub mod coalesce;
pub mod engine;
pub mod inbox;
pub mod read_model;
pub mod store;

pub use alerts::{alert_volume, should_alert, SoundThrottle};
pub use coalesce::CoalescingWindow;
pub use engine::{StoreEvent, SyncEngine, SyncHandle, UpdateOutcome};
pub use inbox::{derive_inboxes, Inboxes};
pub use read_model::{append_ids, has_more, next_selected_conversation_id};
pub use store::{ConversationStore, RecordSnapshot, StoreSnapshot};
