// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST gateway seam.
//!
//! The gateway is an external collaborator returning typed, JSON-shaped
//! records. The sync engine treats it as a black box: it performs the
//! initial bulk fetch, serves reconcile re-fetches, and carries the
//! conversation mutations behind optimistic local updates.

use async_trait::async_trait;

use crate::error::HuddleError;
use crate::types::{
    Account, Conversation, ConversationFilter, ConversationId, ConversationPage,
    ConversationPatch, ConversationRecord, CurrentUser,
};

/// Thin typed wrapper over the product REST API.
#[async_trait]
pub trait ConversationGateway: Send + Sync + 'static {
    /// Fetch the authenticated agent. Called once at session start.
    async fn current_user(&self) -> Result<CurrentUser, HuddleError>;

    /// Fetch account info. Called once at session start.
    async fn account(&self) -> Result<Account, HuddleError>;

    /// Fetch a filtered, paginated conversation listing.
    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<ConversationPage, HuddleError>;

    /// Fetch a single conversation, optionally expanded with its messages.
    async fn conversation(
        &self,
        id: &ConversationId,
        expand_messages: bool,
    ) -> Result<ConversationRecord, HuddleError>;

    /// Apply a partial patch server-side, returning the updated record.
    async fn update_conversation(
        &self,
        id: &ConversationId,
        patch: &ConversationPatch,
    ) -> Result<Conversation, HuddleError>;

    /// Archive/delete a conversation.
    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), HuddleError>;

    /// Count of all messages on the account. Used once at startup to
    /// classify a brand-new account with zero history.
    async fn count_messages(&self) -> Result<u64, HuddleError>;
}
