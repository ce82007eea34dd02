// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed decoding of channel wire events.
//!
//! The transport surfaces raw `(event, payload)` pairs; this module turns
//! the five known event kinds into [`RealtimeEvent`] values. Unknown event
//! names decode to `None` so new server-side events never break old clients.

use serde::Deserialize;
use tracing::debug;

use huddle_core::{Conversation, ConversationId, ConversationPatch, HuddleError, Message};
use huddle_presence::{decode_diff, decode_state, PresenceDiff, PresenceTable};

/// Wire name of the message-created push.
pub const EVENT_MESSAGE_CREATED: &str = "message:created";
/// Wire name of the conversation-created push.
pub const EVENT_CONVERSATION_CREATED: &str = "conversation:created";
/// Wire name of the conversation-updated push.
pub const EVENT_CONVERSATION_UPDATED: &str = "conversation:updated";
/// Wire name of the full presence snapshot push.
pub const EVENT_PRESENCE_STATE: &str = "presence_state";
/// Wire name of the incremental presence diff push.
pub const EVENT_PRESENCE_DIFF: &str = "presence_diff";

/// Outbound push for sending a message, fire-and-forget.
pub const EVENT_MESSAGE_SEND: &str = "message:send";
/// Outbound push for a read receipt, acknowledged by the server.
pub const EVENT_CONVERSATION_READ: &str = "conversation:read";

/// A decoded server push, plus the client-synthesized disconnect marker.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    MessageCreated(Message),
    ConversationCreated(Conversation),
    ConversationUpdated {
        id: ConversationId,
        patch: ConversationPatch,
    },
    /// Full presence table snapshot, sent once on join.
    PresenceState(PresenceTable),
    PresenceDiff(PresenceDiff),
    /// The underlying connection was lost. Emitted once per loss; the
    /// client reconnects on its own.
    Disconnected,
}

#[derive(Deserialize)]
struct ConversationUpdatedWire {
    id: ConversationId,
    #[serde(flatten)]
    patch: ConversationPatch,
}

/// Decode a raw push into a typed event.
///
/// Returns `Ok(None)` for event names this client does not know about.
pub fn decode_event(
    event: &str,
    payload: serde_json::Value,
) -> Result<Option<RealtimeEvent>, HuddleError> {
    let decoded = match event {
        EVENT_MESSAGE_CREATED => {
            let message: Message = decode(event, payload)?;
            RealtimeEvent::MessageCreated(message)
        }
        EVENT_CONVERSATION_CREATED => {
            let conversation: Conversation = decode(event, payload)?;
            RealtimeEvent::ConversationCreated(conversation)
        }
        EVENT_CONVERSATION_UPDATED => {
            let wire: ConversationUpdatedWire = decode(event, payload)?;
            RealtimeEvent::ConversationUpdated {
                id: wire.id,
                patch: wire.patch,
            }
        }
        EVENT_PRESENCE_STATE => RealtimeEvent::PresenceState(decode_state(&payload)),
        EVENT_PRESENCE_DIFF => RealtimeEvent::PresenceDiff(decode_diff(&payload)),
        other => {
            debug!(event = %other, "ignoring unknown channel event");
            return Ok(None);
        }
    };
    Ok(Some(decoded))
}

fn decode<T: serde::de::DeserializeOwned>(
    event: &str,
    payload: serde_json::Value,
) -> Result<T, HuddleError> {
    serde_json::from_value(payload).map_err(|source| HuddleError::Decode {
        event: event.to_string(),
        source,
    })
}
