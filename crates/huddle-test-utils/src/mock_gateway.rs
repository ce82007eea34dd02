// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock REST gateway for deterministic testing.
//!
//! `MockGateway` implements `ConversationGateway` from preloaded fixtures.
//! Pages are served in queue order so pagination tests can script page one,
//! page two, and so on. Mutations are recorded and can be scripted to fail
//! to exercise rollback paths.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use huddle_core::{
    Account, AccountId, Conversation, ConversationFilter, ConversationGateway, ConversationId,
    ConversationPage, ConversationPatch, ConversationRecord, CurrentUser, HuddleError, UserId,
};

/// A recorded mutation call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    List(ConversationFilter),
    Fetch {
        id: ConversationId,
        expand_messages: bool,
    },
    Update {
        id: ConversationId,
        patch: ConversationPatch,
    },
    Delete(ConversationId),
}

#[derive(Default)]
struct GatewayState {
    current_user: Option<CurrentUser>,
    account: Option<Account>,
    pages: VecDeque<ConversationPage>,
    records: HashMap<ConversationId, ConversationRecord>,
    message_count: u64,
    fail_next_updates: u32,
    fail_next_deletes: u32,
    /// Sleep inserted before each update resolves, to model a request
    /// window other events can land inside.
    update_delay: Option<Duration>,
    calls: Vec<GatewayCall>,
}

/// A mock gateway serving canned fixtures.
pub struct MockGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GatewayState::default())),
        }
    }

    /// Shorthand fixture: one agent on one account.
    pub async fn with_session(self, user_id: &str, account_id: &str) -> Self {
        {
            let mut state = self.state.lock().await;
            state.current_user = Some(CurrentUser {
                id: UserId(user_id.to_string()),
                account_id: AccountId(account_id.to_string()),
                email: format!("{user_id}@example.test"),
            });
            state.account = Some(Account {
                id: AccountId(account_id.to_string()),
                company_name: "Example Co".to_string(),
            });
        }
        self
    }

    /// Queue a page for the next `list_conversations` call. Also registers
    /// each record for single-conversation fetches.
    pub async fn push_page(&self, page: ConversationPage) {
        let mut state = self.state.lock().await;
        for record in &page.records {
            state
                .records
                .insert(record.conversation.id.clone(), record.clone());
        }
        state.pages.push_back(page);
    }

    /// Register a record for single-conversation fetches.
    pub async fn insert_record(&self, record: ConversationRecord) {
        self.state
            .lock()
            .await
            .records
            .insert(record.conversation.id.clone(), record);
    }

    pub async fn set_message_count(&self, count: u64) {
        self.state.lock().await.message_count = count;
    }

    /// Script the next `n` update calls to fail.
    pub async fn fail_next_updates(&self, n: u32) {
        self.state.lock().await.fail_next_updates = n;
    }

    /// Script the next `n` delete calls to fail.
    pub async fn fail_next_deletes(&self, n: u32) {
        self.state.lock().await.fail_next_deletes = n;
    }

    /// Delay every update call by `delay` before it resolves.
    pub async fn set_update_delay(&self, delay: Duration) {
        self.state.lock().await.update_delay = Some(delay);
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().await.calls.clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationGateway for MockGateway {
    async fn current_user(&self) -> Result<CurrentUser, HuddleError> {
        self.state
            .lock()
            .await
            .current_user
            .clone()
            .ok_or_else(|| HuddleError::gateway("no current user fixture"))
    }

    async fn account(&self) -> Result<Account, HuddleError> {
        self.state
            .lock()
            .await
            .account
            .clone()
            .ok_or_else(|| HuddleError::gateway("no account fixture"))
    }

    async fn list_conversations(
        &self,
        filter: &ConversationFilter,
    ) -> Result<ConversationPage, HuddleError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::List(filter.clone()));
        Ok(state.pages.pop_front().unwrap_or_default())
    }

    async fn conversation(
        &self,
        id: &ConversationId,
        expand_messages: bool,
    ) -> Result<ConversationRecord, HuddleError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::Fetch {
            id: id.clone(),
            expand_messages,
        });
        let mut record = state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| HuddleError::gateway(format!("no such conversation: {}", id.0)))?;
        if !expand_messages {
            record.messages.clear();
        }
        Ok(record)
    }

    async fn update_conversation(
        &self,
        id: &ConversationId,
        patch: &ConversationPatch,
    ) -> Result<Conversation, HuddleError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(GatewayCall::Update {
                id: id.clone(),
                patch: patch.clone(),
            });
            state.update_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().await;
        if state.fail_next_updates > 0 {
            state.fail_next_updates -= 1;
            return Err(HuddleError::gateway("scripted update failure"));
        }
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| HuddleError::gateway(format!("no such conversation: {}", id.0)))?;
        patch.apply_to(&mut record.conversation);
        Ok(record.conversation.clone())
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), HuddleError> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::Delete(id.clone()));
        if state.fail_next_deletes > 0 {
            state.fail_next_deletes -= 1;
            return Err(HuddleError::gateway("scripted delete failure"));
        }
        state.records.remove(id);
        Ok(())
    }

    async fn count_messages(&self) -> Result<u64, HuddleError> {
        Ok(self.state.lock().await.message_count)
    }
}
