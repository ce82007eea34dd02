// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presence tracking for the Huddle sync core.
//!
//! Presence is a distributed mechanism for tracking which actors
//! (customers/agents) are currently connected, expressed as join/leave
//! diffs against keyed session lists. This crate is purely functional:
//! ownership of the resulting table belongs to whichever component
//! processes presence events (the sync engine, in the consolidated design).

pub mod reducer;
pub mod types;

pub use reducer::{apply_diff, apply_join, apply_leave, decode_diff, decode_state};
pub use types::{PresenceDiff, PresenceKey, PresenceKind, PresenceMeta, PresenceTable};
