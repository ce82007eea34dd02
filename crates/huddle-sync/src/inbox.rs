// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Derived inbox buckets.
//!
//! Buckets are a pure projection of the conversation map, recomputed
//! whenever the map changes; nothing mutates them directly.

use std::collections::BTreeMap;

use huddle_core::{Conversation, ConversationId, ConversationStatus, Priority, UserId};

/// Named partitions of conversation ids driving the dashboard views.
///
/// Ids within each bucket keep the order of the input iterator, which the
/// store supplies already sorted by recency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inboxes {
    pub open: Vec<ConversationId>,
    /// Open conversations assigned to the current agent.
    pub mine: Vec<ConversationId>,
    /// Open conversations flagged priority. Always a subset of `open`.
    pub priority: Vec<ConversationId>,
    pub closed: Vec<ConversationId>,
    pub by_source: BTreeMap<String, Vec<ConversationId>>,
}

/// Project an ordered conversation iterator into buckets.
pub fn derive_inboxes<'a>(
    ordered: impl IntoIterator<Item = &'a Conversation>,
    current_user: Option<&UserId>,
) -> Inboxes {
    let mut inboxes = Inboxes::default();
    for conversation in ordered {
        let id = conversation.id.clone();
        match conversation.status {
            ConversationStatus::Open => {
                inboxes.open.push(id.clone());
                if conversation.priority == Priority::Priority {
                    inboxes.priority.push(id.clone());
                }
                if current_user.is_some() && conversation.assignee_id.as_ref() == current_user {
                    inboxes.mine.push(id.clone());
                }
            }
            ConversationStatus::Closed => inboxes.closed.push(id.clone()),
        }
        inboxes
            .by_source
            .entry(conversation.source.clone())
            .or_default()
            .push(id);
    }
    inboxes
}
