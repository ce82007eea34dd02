// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account-scoped channel client.
//!
//! `ChannelClient` owns exactly one logical channel subscription per
//! account. `connect()` spawns a supervisor task that joins the account
//! topic and pumps transport events into a typed mpsc stream; the consumer
//! side is returned by [`ChannelClient::new`]. Join rejections retry on a
//! fixed delay, unbounded, until `disconnect()` cancels the supervisor.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use huddle_config::model::RealtimeConfig;
use huddle_core::{AccountId, ConversationId, HuddleError, NewMessage, RealtimeTransport, TransportEvent};

use crate::event::{decode_event, RealtimeEvent, EVENT_CONVERSATION_READ, EVENT_MESSAGE_SEND};
use crate::retry::ErrorThrottle;

const EVENT_BUFFER: usize = 512;

/// Result of a `send_message` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The push was issued. Fire-and-forget; no server ack is awaited.
    Sent,
    /// Empty body and no attachments: silently dropped before any push.
    Skipped,
}

struct ClientState {
    topic: Option<String>,
    supervisor: Option<CancellationToken>,
}

/// One live channel subscription per account, with typed event delivery.
pub struct ChannelClient {
    transport: Arc<dyn RealtimeTransport>,
    config: RealtimeConfig,
    events_tx: mpsc::Sender<RealtimeEvent>,
    state: Mutex<ClientState>,
}

impl ChannelClient {
    /// Create a client over an injected transport. The returned receiver
    /// yields every decoded event from the current and all future joins.
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        config: RealtimeConfig,
    ) -> (Self, mpsc::Receiver<RealtimeEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let client = Self {
            transport,
            config,
            events_tx,
            state: Mutex::new(ClientState {
                topic: None,
                supervisor: None,
            }),
        };
        (client, events_rx)
    }

    /// Topic name for an account's notification channel.
    pub fn topic_for(account: &AccountId) -> String {
        format!("notification:{}", account.0)
    }

    /// Subscribe to the account's notification topic.
    ///
    /// Idempotent: any existing subscription is torn down first so there is
    /// never a dual subscription for one client.
    pub async fn connect(&self, account: &AccountId) -> Result<(), HuddleError> {
        let mut state = self.state.lock().await;
        if let Some(old) = state.supervisor.take() {
            old.cancel();
        }
        if let Some(ref old_topic) = state.topic.take() {
            if let Err(e) = self.transport.leave(old_topic).await {
                warn!(topic = %old_topic, error = %e, "failed to leave previous topic");
            }
        }

        let topic = Self::topic_for(account);
        let cancel = CancellationToken::new();
        tokio::spawn(supervise(
            Arc::clone(&self.transport),
            topic.clone(),
            self.events_tx.clone(),
            cancel.clone(),
            self.config.join_retry(),
            self.config.error_window(),
        ));

        state.topic = Some(topic);
        state.supervisor = Some(cancel);
        Ok(())
    }

    /// Leave the topic and close the transport. Safe to call repeatedly and
    /// after the consumer side has been dropped.
    pub async fn disconnect(&self) -> Result<(), HuddleError> {
        let mut state = self.state.lock().await;
        if let Some(cancel) = state.supervisor.take() {
            cancel.cancel();
        }
        if let Some(topic) = state.topic.take() {
            if let Err(e) = self.transport.leave(&topic).await {
                warn!(topic = %topic, error = %e, "failed to leave topic on disconnect");
            }
        }
        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "transport close error on disconnect");
        }
        Ok(())
    }

    /// Push a message onto the channel, fire-and-forget.
    ///
    /// An empty message (blank body, no attachments) resolves as
    /// [`SendOutcome::Skipped`] without touching the transport. The
    /// `sent_at` stamp is applied here, at push time.
    pub async fn send_message(&self, mut message: NewMessage) -> Result<SendOutcome, HuddleError> {
        if message.is_empty() {
            debug!(conversation = %message.conversation_id.0, "dropping empty message send");
            return Ok(SendOutcome::Skipped);
        }
        if message.conversation_id.0.is_empty() {
            return Err(HuddleError::Validation(
                "message has no conversation id".to_string(),
            ));
        }

        let topic = self.current_topic().await?;
        message.sent_at = Some(Utc::now());
        let payload = serde_json::to_value(&message)
            .map_err(|e| HuddleError::Internal(format!("failed to encode message: {e}")))?;
        self.transport
            .push(&topic, EVENT_MESSAGE_SEND, payload)
            .await?;
        Ok(SendOutcome::Sent)
    }

    /// Push a read receipt and wait for the server acknowledgement.
    pub async fn mark_read(&self, conversation_id: &ConversationId) -> Result<(), HuddleError> {
        let topic = self.current_topic().await?;
        let payload = serde_json::json!({ "conversation_id": conversation_id });
        self.transport
            .push_with_ack(&topic, EVENT_CONVERSATION_READ, payload)
            .await?;
        Ok(())
    }

    async fn current_topic(&self) -> Result<String, HuddleError> {
        self.state
            .lock()
            .await
            .topic
            .clone()
            .ok_or_else(|| HuddleError::Internal("channel not connected".to_string()))
    }
}

/// Connect, join, and pump events until cancelled.
///
/// Join rejections and lost connections both fall back to a fixed-delay
/// retry of the full connect sequence. Every (re)join runs the same decode
/// pipeline, so event handling survives channel recreation by construction.
async fn supervise(
    transport: Arc<dyn RealtimeTransport>,
    topic: String,
    events_tx: mpsc::Sender<RealtimeEvent>,
    cancel: CancellationToken,
    retry_delay: Duration,
    error_window: Duration,
) {
    let mut throttle = ErrorThrottle::new(error_window);

    loop {
        if cancel.is_cancelled() {
            return;
        }

        if let Err(e) = transport.connect().await {
            if throttle.should_report(Instant::now()) {
                warn!(topic = %topic, error = %e, "transport connect failed");
            }
            if !sleep_unless_cancelled(&cancel, retry_delay).await {
                return;
            }
            continue;
        }

        if let Err(e) = transport.join(&topic).await {
            warn!(topic = %topic, error = %e, "channel join rejected, retrying");
            if !sleep_unless_cancelled(&cancel, retry_delay).await {
                return;
            }
            continue;
        }
        info!(topic = %topic, "channel joined");

        // Pump until the connection drops or the client disconnects.
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => return,
                received = transport.next_event() => received,
            };

            match received {
                Ok(TransportEvent::Push {
                    topic: push_topic,
                    event,
                    payload,
                }) => {
                    if push_topic != topic {
                        debug!(topic = %push_topic, event = %event, "push for foreign topic");
                        continue;
                    }
                    match decode_event(&event, payload) {
                        Ok(Some(decoded)) => {
                            if events_tx.send(decoded).await.is_err() {
                                // Consumer gone; the subscription is dead.
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(event = %event, error = %e, "failed to decode channel event");
                        }
                    }
                }
                Ok(TransportEvent::Error(message)) => {
                    if throttle.should_report(Instant::now()) {
                        warn!(topic = %topic, error = %message, "transport error");
                    }
                }
                Ok(TransportEvent::Closed) => {
                    info!(topic = %topic, "connection closed, will reconnect");
                    let _ = events_tx.send(RealtimeEvent::Disconnected).await;
                    break;
                }
                Err(e) => {
                    if throttle.should_report(Instant::now()) {
                        warn!(topic = %topic, error = %e, "transport receive error");
                    }
                }
            }
        }

        if !sleep_unless_cancelled(&cancel, retry_delay).await {
            return;
        }
    }
}

/// Returns false if cancelled during the sleep.
async fn sleep_unless_cancelled(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
