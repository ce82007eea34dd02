// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation store: normalized conversation and message maps.
//!
//! The store is the single writer for all conversation state. It is a plain
//! struct with synchronous methods; the engine task owns it and serializes
//! every mutation, so no locking is needed here. Derived views (sorted ids,
//! inbox buckets) are recomputed on demand and never cached stale.

use std::collections::{HashMap, HashSet};

use huddle_core::{
    Conversation, ConversationId, ConversationPatch, ConversationRecord, CustomerId, Message,
    Pagination, UserId,
};
use huddle_presence::{apply_diff, PresenceDiff, PresenceKey, PresenceTable};

use crate::inbox::{derive_inboxes, Inboxes};
use crate::read_model::{append_ids, has_more};

/// Snapshot taken before an optimistic mutation, scoped to one record.
///
/// Restoring it puts back exactly the affected conversation and its
/// messages; concurrent optimistic writes to other records are untouched.
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    pub id: ConversationId,
    pub conversation: Option<Conversation>,
    pub messages: Vec<Message>,
    /// Position in the loaded-ids list, for restoring evicted records.
    pub loaded_position: Option<usize>,
}

/// Immutable view of the store published to readers.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub conversations: HashMap<ConversationId, Conversation>,
    pub messages: HashMap<ConversationId, Vec<Message>>,
    pub sorted_ids: Vec<ConversationId>,
    pub inboxes: Inboxes,
    pub presence: PresenceTable,
    pub selected: Option<ConversationId>,
    pub closing: HashSet<ConversationId>,
    pub loaded_ids: Vec<ConversationId>,
    pub has_more: bool,
    /// Zero message history at session start: a brand-new account.
    pub brand_new_account: bool,
}

impl StoreSnapshot {
    /// Conversations among `ids` still flagged unread. Unknown ids count
    /// for nothing.
    pub fn unread_count(&self, ids: &[ConversationId]) -> usize {
        ids.iter()
            .filter_map(|id| self.conversations.get(id))
            .filter(|conversation| !conversation.read)
            .count()
    }
}

/// Normalized conversation state. Single writer: the engine task.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    presence: PresenceTable,
    selected: Option<ConversationId>,
    /// Conversations mid-transition to closed, held for the UI fade-out.
    closing: HashSet<ConversationId>,
    /// Paginated view ids, in order of first appearance.
    loaded_ids: Vec<ConversationId>,
    pagination: Pagination,
    current_user: Option<UserId>,
    brand_new_account: bool,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_user(&mut self, user: UserId) {
        self.current_user = Some(user);
    }

    pub fn set_brand_new_account(&mut self, brand_new: bool) {
        self.brand_new_account = brand_new;
    }

    /// Merge a batch of records into the maps.
    ///
    /// Existing records are updated, not replaced wholesale; embedded
    /// messages are merged by id and kept sorted ascending by timestamp.
    /// Returns the resulting id order, most recent activity first.
    pub fn set_conversations(&mut self, records: Vec<ConversationRecord>) -> Vec<ConversationId> {
        for record in records {
            let id = record.conversation.id.clone();
            self.conversations.insert(id.clone(), record.conversation);
            for message in record.messages {
                self.insert_message_sorted(message);
            }
            self.messages.entry(id).or_default();
        }
        self.sorted_ids()
    }

    /// Merge one page of the active view: records plus cursor bookkeeping.
    pub fn merge_page(&mut self, records: Vec<ConversationRecord>, pagination: Pagination) {
        let incoming: Vec<ConversationId> = records
            .iter()
            .map(|record| record.conversation.id.clone())
            .collect();
        self.set_conversations(records);
        append_ids(&mut self.loaded_ids, incoming);
        self.pagination = pagination;
    }

    /// Merge one record and make it visible in the loaded view. Used for
    /// conversations that arrive over the channel rather than a page fetch.
    pub fn upsert_record(&mut self, record: ConversationRecord) {
        let id = record.conversation.id.clone();
        self.set_conversations(vec![record]);
        if !self.loaded_ids.contains(&id) {
            self.loaded_ids.push(id);
        }
    }

    pub fn has_more(&self) -> bool {
        has_more(&self.pagination, self.loaded_ids.len())
    }

    pub fn next_cursor(&self) -> Option<String> {
        self.pagination.next.clone()
    }

    /// Insert a message in sort position. Returns false if the id was
    /// already present (duplicate delivery).
    pub fn insert_message_sorted(&mut self, message: Message) -> bool {
        let list = self
            .messages
            .entry(message.conversation_id.clone())
            .or_default();
        if list.iter().any(|existing| existing.id == message.id) {
            return false;
        }
        let key = message.sort_key();
        let position = list.partition_point(|existing| existing.sort_key() <= key);
        list.insert(position, message);
        true
    }

    /// Count of messages held for a conversation.
    pub fn message_count(&self, id: &ConversationId) -> usize {
        self.messages.get(id).map_or(0, Vec::len)
    }

    /// Bump a conversation's activity timestamp forward, never backward.
    pub fn touch_activity(&mut self, id: &ConversationId, at: chrono::DateTime<chrono::Utc>) {
        if let Some(conversation) = self.conversations.get_mut(id) {
            if conversation.last_activity_at.is_none_or(|existing| existing < at) {
                conversation.last_activity_at = Some(at);
            }
        }
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.conversations.contains_key(id)
    }

    pub fn messages(&self, id: &ConversationId) -> &[Message] {
        self.messages.get(id).map_or(&[], Vec::as_slice)
    }

    /// Capture the per-record state an optimistic mutation may need to
    /// restore.
    pub fn snapshot_record(&self, id: &ConversationId) -> RecordSnapshot {
        RecordSnapshot {
            id: id.clone(),
            conversation: self.conversations.get(id).cloned(),
            messages: self.messages.get(id).cloned().unwrap_or_default(),
            loaded_position: self.loaded_ids.iter().position(|loaded| loaded == id),
        }
    }

    /// Restore one record from its snapshot, leaving every other record as
    /// it currently is.
    pub fn restore_record(&mut self, snapshot: RecordSnapshot) {
        match snapshot.conversation {
            Some(conversation) => {
                self.conversations.insert(snapshot.id.clone(), conversation);
                self.messages
                    .insert(snapshot.id.clone(), snapshot.messages);
                if !self.loaded_ids.contains(&snapshot.id) {
                    let position = snapshot
                        .loaded_position
                        .filter(|&p| p <= self.loaded_ids.len())
                        .unwrap_or(self.loaded_ids.len());
                    self.loaded_ids.insert(position, snapshot.id);
                }
            }
            None => {
                self.conversations.remove(&snapshot.id);
                self.messages.remove(&snapshot.id);
                self.loaded_ids.retain(|loaded| loaded != &snapshot.id);
            }
        }
    }

    /// Merge-patch a conversation in place. Returns false if absent.
    pub fn apply_patch(&mut self, id: &ConversationId, patch: &ConversationPatch) -> bool {
        match self.conversations.get_mut(id) {
            Some(conversation) => {
                patch.apply_to(conversation);
                true
            }
            None => false,
        }
    }

    /// Evict a conversation (archival/delete).
    pub fn remove(&mut self, id: &ConversationId) -> bool {
        let existed = self.conversations.remove(id).is_some();
        self.messages.remove(id);
        self.loaded_ids.retain(|loaded| loaded != id);
        self.closing.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        existed
    }

    pub fn set_read(&mut self, id: &ConversationId, read: bool) {
        if let Some(conversation) = self.conversations.get_mut(id) {
            conversation.read = read;
        }
    }

    /// Conversation ids ordered by `last_activity_at` descending; records
    /// with no activity timestamp sort last.
    pub fn sorted_ids(&self) -> Vec<ConversationId> {
        let mut entries: Vec<(&ConversationId, i64)> = self
            .conversations
            .iter()
            .map(|(id, conversation)| (id, conversation.activity_sort_key()))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Inbox buckets over the current map, in recency order.
    pub fn inboxes(&self) -> Inboxes {
        let order = self.sorted_ids();
        let ordered = order
            .iter()
            .filter_map(|id| self.conversations.get(id));
        derive_inboxes(ordered, self.current_user.as_ref())
    }

    /// Conversations among `ids` still flagged unread.
    pub fn unread_count(&self, ids: &[ConversationId]) -> usize {
        ids.iter()
            .filter_map(|id| self.conversations.get(id))
            .filter(|conversation| !conversation.read)
            .count()
    }

    pub fn select(&mut self, id: Option<ConversationId>) {
        self.selected = id;
    }

    pub fn selected(&self) -> Option<&ConversationId> {
        self.selected.as_ref()
    }

    pub fn begin_closing(&mut self, id: ConversationId) {
        self.closing.insert(id);
    }

    pub fn end_closing(&mut self, id: &ConversationId) -> bool {
        self.closing.remove(id)
    }

    pub fn is_closing(&self, id: &ConversationId) -> bool {
        self.closing.contains(id)
    }

    pub fn set_presence(&mut self, table: PresenceTable) {
        self.presence = table;
    }

    pub fn apply_presence_diff(&mut self, diff: &PresenceDiff) {
        self.presence = apply_diff(&self.presence, diff);
    }

    pub fn is_customer_online(&self, customer: &CustomerId) -> bool {
        self.presence
            .is_online(&PresenceKey::customer(customer.0.clone()))
    }

    /// Clone the full read view for publication.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            conversations: self.conversations.clone(),
            messages: self.messages.clone(),
            sorted_ids: self.sorted_ids(),
            inboxes: self.inboxes(),
            presence: self.presence.clone(),
            selected: self.selected.clone(),
            closing: self.closing.clone(),
            loaded_ids: self.loaded_ids.clone(),
            has_more: self.has_more(),
            brand_new_account: self.brand_new_account,
        }
    }
}
