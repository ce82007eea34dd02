// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification and sound policy.
//!
//! Decoupled from the transport: the engine decides *that* a message
//! arrived, this module decides *whether* it warrants an alert and how loud.

use std::time::Duration;

use tokio::time::Instant;

use huddle_core::{Conversation, ConversationStatus, Message};
use huddle_config::model::AlertConfig;

/// True iff the message deserves a visible alert: customer-originated, on an
/// open conversation, while the dashboard view is not active and focused.
pub fn should_alert(conversation: &Conversation, message: &Message, view_active: bool) -> bool {
    message.is_from_customer() && conversation.status == ConversationStatus::Open && !view_active
}

/// Volume tier: a conversation's first-ever message is slightly louder than
/// a follow-up, signalling a new conversation rather than more of one.
pub fn alert_volume(config: &AlertConfig, first_message: bool) -> f32 {
    if first_message {
        config.first_message_volume
    } else {
        config.follow_up_volume
    }
}

/// Trailing-disabled throttle for the notification sound.
///
/// The first trigger in a window always plays; every further trigger inside
/// the window is a no-op.
#[derive(Debug)]
pub struct SoundThrottle {
    window: Duration,
    last_play: Option<Instant>,
}

impl SoundThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_play: None,
        }
    }

    /// True when a sound should actually play; advances the window if so.
    pub fn try_play(&mut self, now: Instant) -> bool {
        match self.last_play {
            Some(last) if now.duration_since(last) < self.window => false,
            _ => {
                self.last_play = Some(now);
                true
            }
        }
    }
}
