// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock realtime transport for deterministic testing.
//!
//! `MockTransport` implements `RealtimeTransport` with injectable inbound
//! events and captured outbound pushes for assertion in tests. Join attempts
//! can be scripted to fail a fixed number of times to exercise the channel
//! client's retry policy.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use huddle_core::{HuddleError, RealtimeTransport, TransportEvent};

/// A captured outbound push.
#[derive(Debug, Clone)]
pub struct CapturedPush {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    /// Whether the push requested a server acknowledgement.
    pub with_ack: bool,
}

#[derive(Default)]
struct TransportState {
    connected: bool,
    joined: Vec<String>,
    /// Full join/leave history for asserting subscription discipline.
    topic_log: Vec<String>,
    fail_next_joins: u32,
    pushes: Vec<CapturedPush>,
    inbound: VecDeque<TransportEvent>,
    ack_response: serde_json::Value,
}

/// A mock pub/sub transport for testing.
///
/// Provides two queues:
/// - **inbound**: Events injected via `inject()` are returned by `next_event()`
/// - **pushes**: Payloads passed to `push()`/`push_with_ack()` are captured
///   and retrievable via `pushes()`
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
    notify: Arc<Notify>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState {
                ack_response: serde_json::json!({"ok": true}),
                ..TransportState::default()
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Inject an inbound event for `next_event()` to return.
    pub async fn inject(&self, event: TransportEvent) {
        self.state.lock().await.inbound.push_back(event);
        self.notify.notify_one();
    }

    /// Inject a server push on the given topic.
    pub async fn inject_push(&self, topic: &str, event: &str, payload: serde_json::Value) {
        self.inject(TransportEvent::Push {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
        })
        .await;
    }

    /// Script the next `n` join attempts to be rejected.
    pub async fn fail_next_joins(&self, n: u32) {
        self.state.lock().await.fail_next_joins = n;
    }

    /// All captured outbound pushes.
    pub async fn pushes(&self) -> Vec<CapturedPush> {
        self.state.lock().await.pushes.clone()
    }

    /// Topics currently joined.
    pub async fn joined_topics(&self) -> Vec<String> {
        self.state.lock().await.joined.clone()
    }

    /// Chronological `join:<topic>` / `leave:<topic>` history.
    pub async fn topic_log(&self) -> Vec<String> {
        self.state.lock().await.topic_log.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.connected
    }

    /// Set the payload returned by `push_with_ack`.
    pub async fn set_ack_response(&self, payload: serde_json::Value) {
        self.state.lock().await.ack_response = payload;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn connect(&self) -> Result<(), HuddleError> {
        self.state.lock().await.connected = true;
        Ok(())
    }

    async fn join(&self, topic: &str) -> Result<(), HuddleError> {
        let mut state = self.state.lock().await;
        if state.fail_next_joins > 0 {
            state.fail_next_joins -= 1;
            return Err(HuddleError::JoinRejected {
                topic: topic.to_string(),
                reason: "scripted rejection".to_string(),
            });
        }
        if !state.joined.iter().any(|t| t == topic) {
            state.joined.push(topic.to_string());
        }
        state.topic_log.push(format!("join:{topic}"));
        Ok(())
    }

    async fn leave(&self, topic: &str) -> Result<(), HuddleError> {
        let mut state = self.state.lock().await;
        state.joined.retain(|t| t != topic);
        state.topic_log.push(format!("leave:{topic}"));
        Ok(())
    }

    async fn close(&self) -> Result<(), HuddleError> {
        self.state.lock().await.connected = false;
        Ok(())
    }

    async fn push(
        &self,
        topic: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<(), HuddleError> {
        self.state.lock().await.pushes.push(CapturedPush {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            with_ack: false,
        });
        Ok(())
    }

    async fn push_with_ack(
        &self,
        topic: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, HuddleError> {
        let mut state = self.state.lock().await;
        state.pushes.push(CapturedPush {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            with_ack: true,
        });
        Ok(state.ack_response.clone())
    }

    async fn next_event(&self) -> Result<TransportEvent, HuddleError> {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(event) = state.inbound.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn next_event_returns_injected_events_in_order() {
        let transport = MockTransport::new();
        transport.inject_push("t", "first", json!({})).await;
        transport.inject_push("t", "second", json!({})).await;

        for expected in ["first", "second"] {
            match transport.next_event().await.unwrap() {
                TransportEvent::Push { event, .. } => assert_eq!(event, expected),
                other => panic!("expected push, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn scripted_join_failures_then_success() {
        let transport = MockTransport::new();
        transport.fail_next_joins(2).await;

        assert!(transport.join("topic").await.is_err());
        assert!(transport.join("topic").await.is_err());
        assert!(transport.join("topic").await.is_ok());
        assert_eq!(transport.joined_topics().await, vec!["topic"]);
    }

    #[tokio::test]
    async fn pushes_are_captured_with_ack_flag() {
        let transport = MockTransport::new();
        transport.push("t", "e", json!({"a": 1})).await.unwrap();
        let ack = transport.push_with_ack("t", "e2", json!({})).await.unwrap();

        assert_eq!(ack, json!({"ok": true}));
        let pushes = transport.pushes().await;
        assert_eq!(pushes.len(), 2);
        assert!(!pushes[0].with_ack);
        assert!(pushes[1].with_ack);
    }

    #[tokio::test]
    async fn next_event_waits_for_injection() {
        let transport = Arc::new(MockTransport::new());
        let clone = Arc::clone(&transport);

        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
            clone.inject(TransportEvent::Closed).await;
        });

        let event = tokio::time::timeout(
            tokio::time::Duration::from_secs(2),
            transport.next_event(),
        )
        .await
        .expect("next_event timed out")
        .unwrap();
        assert!(matches!(event, TransportEvent::Closed));
    }
}
