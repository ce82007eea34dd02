// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Huddle workspace.
//!
//! These are the JSON-shaped records exchanged with the REST gateway and the
//! realtime channel, plus the merge-patch and filter helpers the sync engine
//! operates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

/// Unique identifier for an agent user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Unique identifier for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

/// Lifecycle status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConversationStatus {
    #[default]
    Open,
    Closed,
}

/// Priority flag of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Priority,
    #[default]
    NotPriority,
}

/// A customer conversation as held in the store.
///
/// Conversations are never hard-deleted from the store; archival is a state
/// transition and only an explicit delete evicts the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub account_id: AccountId,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    pub customer_id: CustomerId,
    /// Source channel tag, e.g. "email", "chat", "slack".
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Per-agent-view read flag.
    #[serde(default)]
    pub read: bool,
}

fn default_source() -> String {
    "chat".to_string()
}

impl Conversation {
    /// Sort key for recency ordering: epoch millis, with a negative-infinity
    /// sentinel so conversations with no activity timestamp sort last under
    /// a descending sort.
    pub fn activity_sort_key(&self) -> i64 {
        self.last_activity_at
            .map_or(i64::MIN, |ts| ts.timestamp_millis())
    }
}

/// Who originated a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSender {
    Customer(CustomerId),
    Agent(UserId),
    /// Neither reference populated. Tolerated on decode, treated as
    /// agent-originated for alerting purposes.
    Unknown,
}

/// A single message within a conversation.
///
/// Exactly one of `customer_id` / `user_id` is expected to be populated,
/// determining message direction. Messages are append-only; there are no
/// in-place body edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Classify the sender. `customer_id` wins if both are set, which should
    /// not happen on a well-formed payload.
    pub fn sender(&self) -> MessageSender {
        match (&self.customer_id, &self.user_id) {
            (Some(customer), _) => MessageSender::Customer(customer.clone()),
            (None, Some(user)) => MessageSender::Agent(user.clone()),
            (None, None) => MessageSender::Unknown,
        }
    }

    /// True when the message came from the customer side.
    pub fn is_from_customer(&self) -> bool {
        matches!(self.sender(), MessageSender::Customer(_))
    }

    /// Effective timestamp used for ordering: `created_at`, falling back to
    /// `sent_at` for optimistic local sends the server has not stamped yet.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.sent_at)
    }

    /// Sort key mirroring [`Conversation::activity_sort_key`].
    pub fn sort_key(&self) -> i64 {
        self.timestamp().map_or(i64::MIN, |ts| ts.timestamp_millis())
    }
}

/// An outbound message payload pushed over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub file_ids: Vec<String>,
    /// Stamped by the channel client at push time.
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
}

impl NewMessage {
    /// A send with neither body text nor attachments is a silent no-op.
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty() && self.file_ids.is_empty()
    }
}

/// Merge-patch applied to a conversation record.
///
/// `None` means "leave unchanged". The assignee field is doubly optional so
/// the patch can distinguish "unchanged" from "explicitly unassigned".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub assignee_id: Option<Option<UserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Serde helper keeping `Option<Option<T>>` round-trippable: an explicit
/// `null` deserializes to `Some(None)` (unassign), absence to `None`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

impl ConversationPatch {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
            && self.read.is_none()
            && self.last_activity_at.is_none()
    }

    /// Merge this patch into a conversation record in place.
    pub fn apply_to(&self, conversation: &mut Conversation) {
        if let Some(status) = self.status {
            conversation.status = status;
        }
        if let Some(priority) = self.priority {
            conversation.priority = priority;
        }
        if let Some(ref assignee) = self.assignee_id {
            conversation.assignee_id = assignee.clone();
        }
        if let Some(read) = self.read {
            conversation.read = read;
        }
        if let Some(ts) = self.last_activity_at {
            conversation.last_activity_at = Some(ts);
        }
    }

    /// Patch that closes a conversation.
    pub fn close() -> Self {
        Self {
            status: Some(ConversationStatus::Closed),
            ..Self::default()
        }
    }
}

/// The account the current session belongs to. Read-only after session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(default)]
    pub company_name: String,
}

/// The authenticated agent. Read-only after session start; used to resolve
/// "assigned to me" predicates and the channel topic name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub account_id: AccountId,
    #[serde(default)]
    pub email: String,
}

/// A conversation with its optionally embedded messages, as returned by the
/// gateway's bulk and single fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(flatten)]
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl From<Conversation> for ConversationRecord {
    fn from(conversation: Conversation) -> Self {
        Self {
            conversation,
            messages: Vec::new(),
        }
    }
}

/// Cursor state for a paginated conversation listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pagination {
    /// Opaque cursor for the next page, absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
    /// Total records matching the filter.
    #[serde(default)]
    pub total: usize,
}

/// One page of a conversation listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationPage {
    #[serde(default)]
    pub records: Vec<ConversationRecord>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Filter predicates for the gateway's conversation listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Opaque cursor from a previous page's `pagination.next`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}
