// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture builders for conversation and message records.
//!
//! Timestamps default to a fixed instant so ordering assertions stay
//! deterministic; tests that care about recency pass explicit offsets.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use huddle_core::{
    AccountId, Conversation, ConversationId, ConversationRecord, ConversationStatus, CustomerId,
    Message, MessageId, Priority, UserId,
};

/// Fixed base instant for fixture timestamps.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// `base_time()` plus `secs` seconds.
pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + Duration::seconds(secs)
}

/// An open, unassigned, unread chat conversation with activity at `base_time()`.
pub fn conversation(id: &str) -> Conversation {
    Conversation {
        id: ConversationId(id.to_string()),
        account_id: AccountId("acct-1".to_string()),
        status: ConversationStatus::Open,
        priority: Priority::NotPriority,
        assignee_id: None,
        customer_id: CustomerId(format!("cust-{id}")),
        source: "chat".to_string(),
        last_activity_at: Some(base_time()),
        read: false,
    }
}

/// A record with no embedded messages.
pub fn record(id: &str) -> ConversationRecord {
    ConversationRecord::from(conversation(id))
}

/// A customer-sent message with a random id, created at `base_time()`.
pub fn customer_message(conversation_id: &str, body: &str) -> Message {
    Message {
        id: MessageId(Uuid::new_v4().to_string()),
        conversation_id: ConversationId(conversation_id.to_string()),
        body: body.to_string(),
        customer_id: Some(CustomerId(format!("cust-{conversation_id}"))),
        user_id: None,
        file_ids: Vec::new(),
        created_at: Some(base_time()),
        sent_at: None,
    }
}

/// An agent-sent message with a random id, created at `base_time()`.
pub fn agent_message(conversation_id: &str, user_id: &str, body: &str) -> Message {
    Message {
        id: MessageId(Uuid::new_v4().to_string()),
        conversation_id: ConversationId(conversation_id.to_string()),
        body: body.to_string(),
        customer_id: None,
        user_id: Some(UserId(user_id.to_string())),
        file_ids: Vec::new(),
        created_at: Some(base_time()),
        sent_at: None,
    }
}
