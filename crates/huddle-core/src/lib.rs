// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Huddle conversation sync engine.
//!
//! This crate provides the domain types, error taxonomy, and adapter trait
//! seams used throughout the Huddle workspace. The realtime transport and
//! REST gateway are injected through the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::HuddleError;
pub use traits::{ConversationGateway, RealtimeTransport, TransportEvent};
pub use types::{
    Account, AccountId, Conversation, ConversationFilter, ConversationId, ConversationPage,
    ConversationPatch, ConversationRecord, ConversationStatus, CurrentUser, CustomerId, Message,
    MessageId, MessageSender, NewMessage, Pagination, Priority, UserId,
};
