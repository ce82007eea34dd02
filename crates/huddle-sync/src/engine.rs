// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sync engine: single-writer actor over the conversation store.
//!
//! All mutations happen on one task. UI commands arrive over an mpsc
//! channel, realtime events arrive from the channel client, and REST calls
//! are spawned with their completions re-entering the loop as internal
//! messages, so realtime events interleave freely during the request
//! window. That interleaving is why optimistic mutations snapshot their
//! record first. Readers get a `watch`-published [`StoreSnapshot`] plus a broadcast
//! stream of [`StoreEvent`]s for alerts and connectivity.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use huddle_config::HuddleConfig;
use huddle_core::{
    Conversation, ConversationFilter, ConversationGateway, ConversationId, ConversationPatch,
    ConversationPage, ConversationRecord, HuddleError, Message, NewMessage, RealtimeTransport,
};
use huddle_realtime::{ChannelClient, RealtimeEvent, SendOutcome};

use crate::alerts::{alert_volume, should_alert, SoundThrottle};
use crate::coalesce::CoalescingWindow;
use crate::read_model::next_selected_conversation_id;
use crate::store::{ConversationStore, RecordSnapshot, StoreSnapshot};

const COMMAND_BUFFER: usize = 128;
const EVENT_BUFFER: usize = 128;

/// Resolution of an optimistic mutation. Callers never see an `Err` for a
/// failed REST call; the UI already applied the change, so failure is
/// reported as the rollback having happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    RolledBack,
}

/// Out-of-band store notifications for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A customer message arrived on an open, unselected conversation while
    /// the view was inactive.
    UnreadAlert { conversation_id: ConversationId },
    /// The notification sound should play at this volume.
    SoundPlayed { volume: f32 },
    /// Realtime connectivity was lost. Emitted at most once per session.
    ConnectivityLost,
    /// A conversation finished its closing hold and flipped to closed.
    ConversationClosed(ConversationId),
}

enum Command {
    Select(Option<ConversationId>),
    SetViewActive(bool),
    Update {
        id: ConversationId,
        patch: ConversationPatch,
        reply: oneshot::Sender<UpdateOutcome>,
    },
    Close {
        id: ConversationId,
        reply: oneshot::Sender<UpdateOutcome>,
    },
    Delete {
        id: ConversationId,
        reply: oneshot::Sender<UpdateOutcome>,
    },
    LoadMore {
        reply: oneshot::Sender<Result<bool, HuddleError>>,
    },
}

enum Internal {
    UpdateResolved {
        snapshot: RecordSnapshot,
        result: Result<Conversation, HuddleError>,
        reply: oneshot::Sender<UpdateOutcome>,
    },
    DeleteResolved {
        snapshot: RecordSnapshot,
        result: Result<(), HuddleError>,
        reply: oneshot::Sender<UpdateOutcome>,
    },
    PageLoaded {
        result: Result<ConversationPage, HuddleError>,
        reply: Option<oneshot::Sender<Result<bool, HuddleError>>>,
    },
    RecordFetched {
        id: ConversationId,
        result: Result<ConversationRecord, HuddleError>,
        /// Whether the record was held locally when the fetch was issued.
        known: bool,
    },
}

/// Latest message per conversation held in the coalescing window, plus
/// whether any message in the burst was the conversation's first ever.
struct PendingMessage {
    message: Message,
    first: bool,
}

struct PendingClose {
    reply: oneshot::Sender<UpdateOutcome>,
}

/// Cheap cloneable handle to a running engine.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<StoreSnapshot>,
    events_tx: broadcast::Sender<StoreEvent>,
    client: Arc<ChannelClient>,
    cancel: CancellationToken,
}

impl SyncHandle {
    /// Current read view of the store.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Subscribe to store notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }

    pub async fn select(&self, id: Option<ConversationId>) -> Result<(), HuddleError> {
        self.send(Command::Select(id)).await
    }

    /// Tell the engine whether the dashboard view is active and focused.
    pub async fn set_view_active(&self, active: bool) -> Result<(), HuddleError> {
        self.send(Command::SetViewActive(active)).await
    }

    /// Optimistically patch a conversation. Resolves after the REST call
    /// settles; the optimistic state is visible immediately via snapshots.
    pub async fn update_conversation(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
    ) -> Result<UpdateOutcome, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Update { id, patch, reply }).await?;
        rx.await
            .map_err(|_| HuddleError::Internal("sync engine stopped".to_string()))
    }

    /// Close a conversation via the timed closing hold.
    pub async fn close_conversation(
        &self,
        id: ConversationId,
    ) -> Result<UpdateOutcome, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Close { id, reply }).await?;
        rx.await
            .map_err(|_| HuddleError::Internal("sync engine stopped".to_string()))
    }

    /// Optimistically evict a conversation (archival).
    pub async fn delete_conversation(
        &self,
        id: ConversationId,
    ) -> Result<UpdateOutcome, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Delete { id, reply }).await?;
        rx.await
            .map_err(|_| HuddleError::Internal("sync engine stopped".to_string()))
    }

    /// Fetch the next page of the active view. Resolves to whether more
    /// pages remain.
    pub async fn load_more(&self) -> Result<bool, HuddleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::LoadMore { reply }).await?;
        rx.await
            .map_err(|_| HuddleError::Internal("sync engine stopped".to_string()))?
    }

    /// Push a message onto the channel. Empty messages are silently skipped.
    pub async fn send_message(&self, message: NewMessage) -> Result<SendOutcome, HuddleError> {
        self.client.send_message(message).await
    }

    /// Stop the engine and tear down the channel subscription.
    pub async fn stop(&self) -> Result<(), HuddleError> {
        self.cancel.cancel();
        self.client.disconnect().await
    }

    async fn send(&self, command: Command) -> Result<(), HuddleError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HuddleError::Internal("sync engine stopped".to_string()))
    }
}

/// Builds and runs the engine task.
pub struct SyncEngine;

impl SyncEngine {
    /// Start a session: fetch the session bootstrap data over REST, join
    /// the account's notification channel, and spawn the engine loop.
    pub async fn start(
        gateway: Arc<dyn ConversationGateway>,
        transport: Arc<dyn RealtimeTransport>,
        config: HuddleConfig,
    ) -> Result<SyncHandle, HuddleError> {
        let (client, realtime_rx) = ChannelClient::new(transport, config.realtime.clone());
        let client = Arc::new(client);

        let current_user = gateway.current_user().await?;
        let account = gateway.account().await?;
        let message_count = gateway.count_messages().await?;
        let first_page = gateway
            .list_conversations(&ConversationFilter {
                page_size: Some(config.sync.page_size),
                ..ConversationFilter::default()
            })
            .await?;

        let mut store = ConversationStore::new();
        store.set_current_user(current_user.id.clone());
        store.set_brand_new_account(message_count == 0);
        store.merge_page(first_page.records, first_page.pagination);

        client.connect(&account.id).await?;
        info!(
            account = %account.id.0,
            user = %current_user.id.0,
            brand_new = message_count == 0,
            "sync session started"
        );

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(store.snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let state = EngineState {
            store,
            gateway,
            client: Arc::clone(&client),
            snapshot_tx,
            events_tx: events_tx.clone(),
            internal_tx,
            messages_pending: CoalescingWindow::new(config.sync.coalesce_window()),
            updates_pending: CoalescingWindow::new(config.sync.coalesce_window()),
            closings_pending: CoalescingWindow::new(config.sync.closing_hold()),
            sound: SoundThrottle::new(config.alerts.sound_window()),
            config,
            view_active: true,
            connectivity_notified: false,
        };
        tokio::spawn(run(
            state,
            commands_rx,
            realtime_rx,
            internal_rx,
            cancel.clone(),
        ));

        Ok(SyncHandle {
            commands: commands_tx,
            snapshot_rx,
            events_tx,
            client,
            cancel,
        })
    }
}

struct EngineState {
    store: ConversationStore,
    gateway: Arc<dyn ConversationGateway>,
    client: Arc<ChannelClient>,
    snapshot_tx: watch::Sender<StoreSnapshot>,
    events_tx: broadcast::Sender<StoreEvent>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    messages_pending: CoalescingWindow<ConversationId, PendingMessage>,
    updates_pending: CoalescingWindow<ConversationId, ConversationPatch>,
    closings_pending: CoalescingWindow<ConversationId, PendingClose>,
    sound: SoundThrottle,
    config: HuddleConfig,
    view_active: bool,
    connectivity_notified: bool,
}

async fn run(
    mut state: EngineState,
    mut commands_rx: mpsc::Receiver<Command>,
    mut realtime_rx: mpsc::Receiver<RealtimeEvent>,
    mut internal_rx: mpsc::UnboundedReceiver<Internal>,
    cancel: CancellationToken,
) {
    loop {
        let deadline = [
            state.messages_pending.next_deadline(),
            state.updates_pending.next_deadline(),
            state.closings_pending.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min();

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("sync engine stopping");
                break;
            }
            command = commands_rx.recv() => match command {
                Some(command) => state.handle_command(command),
                None => break,
            },
            event = realtime_rx.recv() => match event {
                Some(event) => state.handle_realtime(event),
                // Channel client torn down; commands may still arrive.
                None => realtime_rx = never_recv(),
            },
            internal = internal_rx.recv() => {
                if let Some(internal) = internal {
                    state.handle_internal(internal);
                }
            }
            _ = sleep_until_or_forever(deadline) => state.flush(Instant::now()),
        }
    }
}

/// A receiver that never yields, swapped in once the realtime stream ends.
fn never_recv<T>() -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(1);
    std::mem::forget(tx);
    rx
}

async fn sleep_until_or_forever(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl EngineState {
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Select(id) => {
                if let Some(ref id) = id {
                    if self.store.contains(id) {
                        self.store.set_read(id, true);
                        self.spawn_mark_read(id.clone());
                        // Listing pages do not embed history; hydrate on
                        // first read.
                        if self.store.message_count(id) == 0 {
                            self.spawn_record_fetch(id.clone(), true);
                        }
                    }
                }
                self.store.select(id);
                self.publish();
            }
            Command::SetViewActive(active) => {
                self.view_active = active;
            }
            Command::Update { id, patch, reply } => {
                if !self.store.contains(&id) {
                    let _ = reply.send(UpdateOutcome::RolledBack);
                    return;
                }
                let snapshot = self.store.snapshot_record(&id);
                self.store.apply_patch(&id, &patch);
                self.publish();
                self.spawn_update(id, patch, snapshot, reply);
            }
            Command::Close { id, reply } => {
                // A close for an absent or already-closing record must not
                // replace the pending hold and orphan its reply.
                if !self.store.contains(&id) || self.store.is_closing(&id) {
                    let _ = reply.send(UpdateOutcome::RolledBack);
                    return;
                }
                // Timed hold so the UI can animate the removal first.
                self.store.begin_closing(id.clone());
                self.publish();
                self.closings_pending
                    .push(Instant::now(), id, PendingClose { reply });
            }
            Command::Delete { id, reply } => {
                if !self.store.contains(&id) {
                    let _ = reply.send(UpdateOutcome::RolledBack);
                    return;
                }
                // Move the selection off the record before evicting it.
                let next = if self.store.selected() == Some(&id) {
                    next_selected_conversation_id(Some(&id), &self.store.sorted_ids())
                        .filter(|candidate| candidate != &id)
                } else {
                    None
                };
                let snapshot = self.store.snapshot_record(&id);
                self.store.remove(&id);
                if next.is_some() {
                    self.store.select(next);
                }
                self.publish();

                let gateway = Arc::clone(&self.gateway);
                let internal = self.internal_tx.clone();
                tokio::spawn(async move {
                    let result = gateway.delete_conversation(&id).await;
                    let _ = internal.send(Internal::DeleteResolved {
                        snapshot,
                        result,
                        reply,
                    });
                });
            }
            Command::LoadMore { reply } => {
                if !self.store.has_more() {
                    let _ = reply.send(Ok(false));
                    return;
                }
                let filter = ConversationFilter {
                    after: self.store.next_cursor(),
                    page_size: Some(self.config.sync.page_size),
                    ..ConversationFilter::default()
                };
                self.spawn_page_fetch(filter, Some(reply));
            }
        }
    }

    fn handle_realtime(&mut self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::MessageCreated(message) => self.handle_new_message(message),
            RealtimeEvent::ConversationCreated(conversation) => {
                if !self.store.contains(&conversation.id) {
                    self.store
                        .upsert_record(ConversationRecord::from(conversation));
                    self.publish();
                }
            }
            RealtimeEvent::ConversationUpdated { id, patch } => {
                self.updates_pending
                    .push_with(Instant::now(), id, patch, merge_patch);
            }
            RealtimeEvent::PresenceState(table) => {
                self.store.set_presence(table);
                self.publish();
            }
            RealtimeEvent::PresenceDiff(diff) => {
                self.store.apply_presence_diff(&diff);
                self.publish();
            }
            RealtimeEvent::Disconnected => {
                if !self.connectivity_notified {
                    self.connectivity_notified = true;
                    warn!("realtime connectivity lost");
                    let _ = self.events_tx.send(StoreEvent::ConnectivityLost);
                }
            }
        }
    }

    fn handle_new_message(&mut self, message: Message) {
        let id = message.conversation_id.clone();
        if !self.store.contains(&id) {
            // No parent record to hang the message on; fetch the full
            // record (message included) rather than hold an orphan.
            debug!(conversation = %id.0, "message for unknown conversation, fetching record");
            self.spawn_record_fetch(id, false);
            return;
        }
        if !self.store.insert_message_sorted(message.clone()) {
            debug!(conversation = %id.0, message = %message.id.0, "duplicate message delivery");
            return;
        }
        let first = self.store.message_count(&id) == 1;
        if let Some(at) = message.timestamp() {
            self.store.touch_activity(&id, at);
        }
        self.publish();

        self.messages_pending.push_with(
            Instant::now(),
            id,
            PendingMessage { message, first },
            |held, new| {
                held.first = held.first || new.first;
                held.message = new.message;
            },
        );
    }

    fn handle_internal(&mut self, internal: Internal) {
        match internal {
            Internal::UpdateResolved {
                snapshot,
                result,
                reply,
            } => match result {
                Ok(_) => {
                    let _ = reply.send(UpdateOutcome::Applied);
                }
                Err(e) => {
                    warn!(conversation = %snapshot.id.0, error = %e, "conversation update failed, rolling back");
                    // A record deleted during the request stays deleted.
                    if snapshot.conversation.is_none() || self.store.contains(&snapshot.id) {
                        self.store.restore_record(snapshot);
                        self.publish();
                    }
                    let _ = reply.send(UpdateOutcome::RolledBack);
                }
            },
            Internal::DeleteResolved {
                snapshot,
                result,
                reply,
            } => match result {
                Ok(()) => {
                    let _ = reply.send(UpdateOutcome::Applied);
                }
                Err(e) => {
                    warn!(conversation = %snapshot.id.0, error = %e, "conversation delete failed, restoring");
                    self.store.restore_record(snapshot);
                    self.publish();
                    let _ = reply.send(UpdateOutcome::RolledBack);
                }
            },
            Internal::PageLoaded { result, reply } => match result {
                Ok(page) => {
                    self.store.merge_page(page.records, page.pagination);
                    self.publish();
                    if let Some(reply) = reply {
                        let _ = reply.send(Ok(self.store.has_more()));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "conversation page fetch failed");
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(e));
                    }
                }
            },
            Internal::RecordFetched { id, result, known } => match result {
                Ok(record) => {
                    // A record deleted while the fetch was in flight stays
                    // deleted.
                    if known && !self.store.contains(&id) {
                        debug!(conversation = %id.0, "dropping fetch for evicted conversation");
                        return;
                    }
                    self.store.upsert_record(record);
                    self.publish();
                }
                Err(e) => {
                    warn!(conversation = %id.0, error = %e, "conversation fetch failed");
                }
            },
        }
    }

    /// Flush every coalescing window whose deadline has passed.
    fn flush(&mut self, now: Instant) {
        for (id, pending) in self.messages_pending.take_expired(now) {
            self.flush_message(now, id, pending);
        }

        for (id, patch) in self.updates_pending.take_expired(now) {
            self.store.apply_patch(&id, &patch);
            self.publish();
            // Guard against missed events with a reconcile of the active view.
            let filter = ConversationFilter {
                page_size: Some(self.config.sync.page_size),
                ..ConversationFilter::default()
            };
            self.spawn_page_fetch(filter, None);
        }

        for (id, pending) in self.closings_pending.take_expired(now) {
            self.flush_close(id, pending);
        }
    }

    fn flush_message(&mut self, now: Instant, id: ConversationId, pending: PendingMessage) {
        if self.store.selected() == Some(&id) {
            self.store.set_read(&id, true);
            self.spawn_mark_read(id);
            self.publish();
            return;
        }

        self.store.set_read(&id, false);
        if let Some(conversation) = self.store.conversation(&id) {
            if should_alert(conversation, &pending.message, self.view_active) {
                let _ = self.events_tx.send(StoreEvent::UnreadAlert {
                    conversation_id: id.clone(),
                });
                if self.sound.try_play(now) {
                    let volume = alert_volume(&self.config.alerts, pending.first);
                    let _ = self.events_tx.send(StoreEvent::SoundPlayed { volume });
                }
            }
        }
        self.publish();
    }

    fn flush_close(&mut self, id: ConversationId, pending: PendingClose) {
        self.store.end_closing(&id);
        if !self.store.contains(&id) {
            let _ = pending.reply.send(UpdateOutcome::RolledBack);
            return;
        }

        let snapshot = self.store.snapshot_record(&id);
        let patch = ConversationPatch::close();
        self.store.apply_patch(&id, &patch);
        self.publish();
        let _ = self
            .events_tx
            .send(StoreEvent::ConversationClosed(id.clone()));
        self.spawn_update(id, patch, snapshot, pending.reply);
    }

    fn spawn_update(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
        snapshot: RecordSnapshot,
        reply: oneshot::Sender<UpdateOutcome>,
    ) {
        let gateway = Arc::clone(&self.gateway);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = gateway.update_conversation(&id, &patch).await;
            let _ = internal.send(Internal::UpdateResolved {
                snapshot,
                result,
                reply,
            });
        });
    }

    fn spawn_page_fetch(
        &self,
        filter: ConversationFilter,
        reply: Option<oneshot::Sender<Result<bool, HuddleError>>>,
    ) {
        let gateway = Arc::clone(&self.gateway);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = gateway.list_conversations(&filter).await;
            let _ = internal.send(Internal::PageLoaded { result, reply });
        });
    }

    /// Fetch one conversation with its messages expanded. `known` records
    /// whether the store held the record at spawn time, so a deletion that
    /// lands during the request window is not undone by the completion.
    fn spawn_record_fetch(&self, id: ConversationId, known: bool) {
        let gateway = Arc::clone(&self.gateway);
        let internal = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = gateway.conversation(&id, true).await;
            let _ = internal.send(Internal::RecordFetched { id, result, known });
        });
    }

    fn spawn_mark_read(&self, id: ConversationId) {
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            if let Err(e) = client.mark_read(&id).await {
                debug!(conversation = %id.0, error = %e, "read receipt failed");
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.store.snapshot());
    }
}

/// Later patch fields win; earlier fields survive unless overwritten.
fn merge_patch(held: &mut ConversationPatch, new: ConversationPatch) {
    if new.status.is_some() {
        held.status = new.status;
    }
    if new.priority.is_some() {
        held.priority = new.priority;
    }
    if new.assignee_id.is_some() {
        held.assignee_id = new.assignee_id;
    }
    if new.read.is_some() {
        held.read = new.read;
    }
    if new.last_activity_at.is_some() {
        held.last_activity_at = new.last_activity_at;
    }
}
