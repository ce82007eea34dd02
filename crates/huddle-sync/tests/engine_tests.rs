// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end engine tests over mock gateway and transport.
//!
//! All tests run under a paused clock so the coalescing windows, closing
//! hold, and reconnect delays are exercised deterministically.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use huddle_config::HuddleConfig;
use huddle_core::{
    ConversationId, ConversationPage, ConversationPatch, ConversationRecord, ConversationStatus,
    Pagination, Priority, TransportEvent,
};
use huddle_presence::PresenceKey;
use huddle_sync::{StoreEvent, SyncEngine, SyncHandle, UpdateOutcome};
use huddle_test_utils::fixtures;
use huddle_test_utils::{GatewayCall, MockGateway, MockTransport};

const TOPIC: &str = "notification:acct-1";

struct Harness {
    handle: SyncHandle,
    gateway: Arc<MockGateway>,
    transport: Arc<MockTransport>,
}

async fn start(records: Vec<ConversationRecord>) -> Harness {
    start_with_page(records, Pagination::default(), 5).await
}

async fn start_with_page(
    records: Vec<ConversationRecord>,
    pagination: Pagination,
    message_count: u64,
) -> Harness {
    let gateway = Arc::new(MockGateway::new().with_session("u1", "acct-1").await);
    gateway.set_message_count(message_count).await;
    gateway
        .push_page(ConversationPage {
            records,
            pagination,
        })
        .await;
    let transport = Arc::new(MockTransport::new());

    let handle = SyncEngine::start(
        gateway.clone(),
        transport.clone(),
        HuddleConfig::default(),
    )
    .await
    .expect("engine start");
    // Let the channel supervisor join.
    sleep(Duration::from_millis(1)).await;

    Harness {
        handle,
        gateway,
        transport,
    }
}

fn id(name: &str) -> ConversationId {
    ConversationId(name.to_string())
}

#[tokio::test(start_paused = true)]
async fn startup_populates_snapshot_and_joins_channel() {
    let harness = start(vec![fixtures::record("c1"), fixtures::record("c2")]).await;

    let snapshot = harness.handle.snapshot();
    assert_eq!(snapshot.conversations.len(), 2);
    assert_eq!(snapshot.inboxes.open.len(), 2);
    assert!(!snapshot.brand_new_account);
    assert_eq!(harness.transport.joined_topics().await, vec![TOPIC]);
}

#[tokio::test(start_paused = true)]
async fn zero_message_history_classifies_a_brand_new_account() {
    let harness = start_with_page(vec![], Pagination::default(), 0).await;
    assert!(harness.handle.snapshot().brand_new_account);
}

#[tokio::test(start_paused = true)]
async fn out_of_order_messages_are_resorted() {
    let harness = start(vec![fixtures::record("c1")]).await;

    for (message_id, offset) in [("m3", 30), ("m1", 10), ("m2", 20)] {
        harness
            .transport
            .inject_push(
                TOPIC,
                "message:created",
                json!({
                    "id": message_id,
                    "conversation_id": "c1",
                    "body": "hi",
                    "customer_id": "cust-c1",
                    "created_at": fixtures::at(offset).to_rfc3339(),
                }),
            )
            .await;
    }
    sleep(Duration::from_millis(1)).await;

    let snapshot = harness.handle.snapshot();
    let order: Vec<&str> = snapshot.messages[&id("c1")]
        .iter()
        .map(|m| m.id.0.as_str())
        .collect();
    assert_eq!(order, vec!["m1", "m2", "m3"]);
}

#[tokio::test(start_paused = true)]
async fn message_burst_coalesces_to_one_alert() {
    let harness = start(vec![fixtures::record("c1")]).await;
    harness.handle.set_view_active(false).await.unwrap();
    let mut events = harness.handle.subscribe();

    for (message_id, offset_ms) in [("m1", 0u64), ("m2", 100), ("m3", 100)] {
        sleep(Duration::from_millis(offset_ms)).await;
        harness
            .transport
            .inject_push(
                TOPIC,
                "message:created",
                json!({
                    "id": message_id,
                    "conversation_id": "c1",
                    "body": "hi",
                    "customer_id": "cust-c1",
                    "created_at": fixtures::at(1).to_rfc3339(),
                }),
            )
            .await;
    }
    // Past the trailing edge of the coalescing window.
    sleep(Duration::from_millis(500)).await;

    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::UnreadAlert {
            conversation_id: id("c1")
        }
    );
    // First-ever message for the conversation plays the louder tier.
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::SoundPlayed { volume: 0.2 }
    );
    assert!(events.try_recv().is_err());
    assert!(!harness.handle.snapshot().conversations[&id("c1")].read);
}

#[tokio::test(start_paused = true)]
async fn messages_for_the_selected_conversation_are_marked_read() {
    let harness = start(vec![fixtures::record("c1")]).await;
    harness.handle.select(Some(id("c1"))).await.unwrap();

    harness
        .transport
        .inject_push(
            TOPIC,
            "message:created",
            json!({
                "id": "m1",
                "conversation_id": "c1",
                "body": "hi",
                "customer_id": "cust-c1",
                "created_at": fixtures::at(1).to_rfc3339(),
            }),
        )
        .await;
    sleep(Duration::from_millis(500)).await;

    assert!(harness.handle.snapshot().conversations[&id("c1")].read);
    let receipts: Vec<_> = harness
        .transport
        .pushes()
        .await
        .into_iter()
        .filter(|p| p.event == "conversation:read")
        .collect();
    assert!(!receipts.is_empty());
    assert!(receipts.iter().all(|p| p.with_ack));
}

#[tokio::test(start_paused = true)]
async fn failed_update_rolls_back_only_its_own_record() {
    let harness = start(vec![fixtures::record("c1"), fixtures::record("c2")]).await;
    harness.gateway.fail_next_updates(1).await;

    let priority_patch = ConversationPatch {
        priority: Some(Priority::Priority),
        ..ConversationPatch::default()
    };

    let outcome = harness
        .handle
        .update_conversation(id("c1"), priority_patch.clone())
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::RolledBack);

    let outcome = harness
        .handle
        .update_conversation(id("c2"), priority_patch)
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied);

    let snapshot = harness.handle.snapshot();
    assert_eq!(
        snapshot.conversations[&id("c1")].priority,
        Priority::NotPriority
    );
    assert_eq!(snapshot.conversations[&id("c2")].priority, Priority::Priority);
}

#[tokio::test(start_paused = true)]
async fn closing_is_a_timed_state_not_an_instant_flip() {
    let harness = start(vec![fixtures::record("c1")]).await;
    let mut events = harness.handle.subscribe();

    let handle = harness.handle.clone();
    let close_task = tokio::spawn(async move { handle.close_conversation(id("c1")).await });
    sleep(Duration::from_millis(100)).await;

    // Mid-hold: still open, flagged closing for the UI fade-out.
    let snapshot = harness.handle.snapshot();
    assert!(snapshot.closing.contains(&id("c1")));
    assert_eq!(
        snapshot.conversations[&id("c1")].status,
        ConversationStatus::Open
    );

    sleep(Duration::from_millis(400)).await;
    let snapshot = harness.handle.snapshot();
    assert!(snapshot.closing.is_empty());
    assert_eq!(
        snapshot.conversations[&id("c1")].status,
        ConversationStatus::Closed
    );
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::ConversationClosed(id("c1"))
    );
    assert_eq!(close_task.await.unwrap().unwrap(), UpdateOutcome::Applied);
}

#[tokio::test(start_paused = true)]
async fn failed_delete_restores_the_conversation() {
    let harness = start(vec![fixtures::record("c1")]).await;
    harness.gateway.fail_next_deletes(1).await;

    let outcome = harness.handle.delete_conversation(id("c1")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::RolledBack);
    assert!(harness.handle.snapshot().conversations.contains_key(&id("c1")));

    let outcome = harness.handle.delete_conversation(id("c1")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied);
    assert!(!harness.handle.snapshot().conversations.contains_key(&id("c1")));
}

#[tokio::test(start_paused = true)]
async fn update_events_coalesce_and_trigger_a_reconcile_fetch() {
    let harness = start(vec![fixtures::record("c1")]).await;
    let calls_before = harness.gateway.calls().await.len();

    harness
        .transport
        .inject_push(TOPIC, "conversation:updated", json!({"id": "c1", "priority": "priority"}))
        .await;
    sleep(Duration::from_millis(100)).await;
    harness
        .transport
        .inject_push(TOPIC, "conversation:updated", json!({"id": "c1", "status": "closed"}))
        .await;
    sleep(Duration::from_millis(500)).await;

    // Both patches land as one merged application.
    let conversation = &harness.handle.snapshot().conversations[&id("c1")];
    assert_eq!(conversation.priority, Priority::Priority);
    assert_eq!(conversation.status, ConversationStatus::Closed);

    // One reconcile fetch of the active view, not one per event.
    let list_calls = harness
        .gateway
        .calls()
        .await
        .into_iter()
        .skip(calls_before)
        .filter(|call| matches!(call, GatewayCall::List(_)))
        .count();
    assert_eq!(list_calls, 1);
}

#[tokio::test(start_paused = true)]
async fn connectivity_loss_notifies_once_per_session() {
    let harness = start(vec![fixtures::record("c1")]).await;
    let mut events = harness.handle.subscribe();

    harness.transport.inject(TransportEvent::Closed).await;
    sleep(Duration::from_millis(1)).await;
    assert_eq!(events.recv().await.unwrap(), StoreEvent::ConnectivityLost);

    // Reconnect happens after the retry delay; a second drop stays silent.
    sleep(Duration::from_secs(11)).await;
    harness.transport.inject(TransportEvent::Closed).await;
    sleep(Duration::from_secs(1)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn load_more_appends_with_dedup() {
    let harness = start_with_page(
        vec![fixtures::record("c1"), fixtures::record("c2")],
        Pagination {
            next: Some("p2".into()),
            total: 3,
        },
        5,
    )
    .await;
    assert!(harness.handle.snapshot().has_more);

    harness
        .gateway
        .push_page(ConversationPage {
            records: vec![fixtures::record("c2"), fixtures::record("c3")],
            pagination: Pagination {
                next: None,
                total: 3,
            },
        })
        .await;

    let more = harness.handle.load_more().await.unwrap();
    assert!(!more);

    let snapshot = harness.handle.snapshot();
    assert_eq!(snapshot.loaded_ids, vec![id("c1"), id("c2"), id("c3")]);
    assert!(!snapshot.has_more);
}

#[tokio::test(start_paused = true)]
async fn presence_snapshot_drives_the_online_predicate() {
    let harness = start(vec![fixtures::record("c1")]).await;

    harness
        .transport
        .inject_push(
            TOPIC,
            "presence_state",
            json!({"customer:cust-c1": {"metas": [{"phx_ref": "r1"}]}}),
        )
        .await;
    sleep(Duration::from_millis(1)).await;

    let snapshot = harness.handle.snapshot();
    assert!(snapshot.presence.is_online(&PresenceKey::customer("cust-c1")));

    harness
        .transport
        .inject_push(
            TOPIC,
            "presence_diff",
            json!({
                "joins": {},
                "leaves": {"customer:cust-c1": {"metas": [{"phx_ref": "r1"}]}},
            }),
        )
        .await;
    sleep(Duration::from_millis(1)).await;

    let snapshot = harness.handle.snapshot();
    assert!(!snapshot.presence.is_online(&PresenceKey::customer("cust-c1")));
}

#[tokio::test(start_paused = true)]
async fn conversation_created_event_appears_in_the_view() {
    let harness = start(vec![fixtures::record("c1")]).await;

    harness
        .transport
        .inject_push(
            TOPIC,
            "conversation:created",
            json!({
                "id": "c9",
                "account_id": "acct-1",
                "customer_id": "cust-c9",
                "status": "open",
                "last_activity_at": fixtures::at(60).to_rfc3339(),
            }),
        )
        .await;
    sleep(Duration::from_millis(1)).await;

    let snapshot = harness.handle.snapshot();
    assert!(snapshot.conversations.contains_key(&id("c9")));
    assert!(snapshot.loaded_ids.contains(&id("c9")));
    // Fresh activity sorts it first.
    assert_eq!(snapshot.sorted_ids.first(), Some(&id("c9")));
}

#[tokio::test(start_paused = true)]
async fn agent_messages_do_not_alert() {
    let harness = start(vec![fixtures::record("c1")]).await;
    harness.handle.set_view_active(false).await.unwrap();
    let mut events = harness.handle.subscribe();

    harness
        .transport
        .inject_push(
            TOPIC,
            "message:created",
            json!({
                "id": "m1",
                "conversation_id": "c1",
                "body": "agent reply",
                "user_id": "u1",
                "created_at": fixtures::at(1).to_rfc3339(),
            }),
        )
        .await;
    sleep(Duration::from_millis(500)).await;

    assert!(events.try_recv().is_err());
    // The conversation still flips unread; it just stays quiet.
    assert!(!harness.handle.snapshot().conversations[&id("c1")].read);
}

#[tokio::test(start_paused = true)]
async fn selecting_an_unhydrated_conversation_fetches_its_messages() {
    let harness = start(vec![fixtures::record("c1")]).await;
    let mut hydrated = fixtures::record("c1");
    hydrated.messages.push(fixtures::customer_message("c1", "hello"));
    harness.gateway.insert_record(hydrated).await;

    harness.handle.select(Some(id("c1"))).await.unwrap();
    sleep(Duration::from_millis(1)).await;

    let snapshot = harness.handle.snapshot();
    assert_eq!(snapshot.messages[&id("c1")].len(), 1);
    assert!(harness.gateway.calls().await.iter().any(|call| matches!(
        call,
        GatewayCall::Fetch {
            id,
            expand_messages: true,
        } if id.0 == "c1"
    )));
}

#[tokio::test(start_paused = true)]
async fn message_for_an_unknown_conversation_fetches_the_record() {
    let harness = start(vec![fixtures::record("c1")]).await;
    let mut discovered = fixtures::record("c9");
    discovered
        .messages
        .push(fixtures::customer_message("c9", "new here"));
    harness.gateway.insert_record(discovered).await;

    harness
        .transport
        .inject_push(
            TOPIC,
            "message:created",
            json!({
                "id": "m9",
                "conversation_id": "c9",
                "body": "new here",
                "customer_id": "cust-c9",
                "created_at": fixtures::at(1).to_rfc3339(),
            }),
        )
        .await;
    sleep(Duration::from_millis(1)).await;

    let snapshot = harness.handle.snapshot();
    assert!(snapshot.conversations.contains_key(&id("c9")));
    assert_eq!(snapshot.messages[&id("c9")].len(), 1);
    assert!(snapshot.loaded_ids.contains(&id("c9")));
}

#[tokio::test(start_paused = true)]
async fn in_flight_update_for_a_deleted_conversation_stays_deleted() {
    let harness = start(vec![fixtures::record("c1")]).await;
    harness.gateway.fail_next_updates(1).await;
    harness
        .gateway
        .set_update_delay(Duration::from_secs(1))
        .await;

    let handle = harness.handle.clone();
    let update_task = tokio::spawn(async move {
        let patch = ConversationPatch {
            priority: Some(Priority::Priority),
            ..ConversationPatch::default()
        };
        handle.update_conversation(id("c1"), patch).await
    });
    // Let the update command land and its request open.
    sleep(Duration::from_millis(10)).await;

    let outcome = harness.handle.delete_conversation(id("c1")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied);

    // The failed update must not resurrect the evicted record.
    assert_eq!(
        update_task.await.unwrap().unwrap(),
        UpdateOutcome::RolledBack
    );
    let snapshot = harness.handle.snapshot();
    assert!(!snapshot.conversations.contains_key(&id("c1")));
    assert!(!snapshot.loaded_ids.contains(&id("c1")));
}

#[tokio::test(start_paused = true)]
async fn a_second_close_during_the_hold_resolves_rolled_back() {
    let harness = start(vec![fixtures::record("c1")]).await;

    let handle = harness.handle.clone();
    let first = tokio::spawn(async move { handle.close_conversation(id("c1")).await });
    sleep(Duration::from_millis(100)).await;

    let second = harness.handle.close_conversation(id("c1")).await.unwrap();
    assert_eq!(second, UpdateOutcome::RolledBack);

    // The original hold still runs to completion on schedule.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(first.await.unwrap().unwrap(), UpdateOutcome::Applied);
    assert_eq!(
        harness.handle.snapshot().conversations[&id("c1")].status,
        ConversationStatus::Closed
    );
}

#[tokio::test(start_paused = true)]
async fn deleting_the_selected_conversation_advances_the_selection() {
    let harness = start(vec![
        fixtures::record("c1"),
        fixtures::record("c2"),
        fixtures::record("c3"),
    ])
    .await;
    harness.handle.select(Some(id("c1"))).await.unwrap();

    let outcome = harness.handle.delete_conversation(id("c1")).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied);

    let snapshot = harness.handle.snapshot();
    assert!(!snapshot.conversations.contains_key(&id("c1")));
    assert_eq!(snapshot.selected, Some(id("c2")));
}

#[tokio::test(start_paused = true)]
async fn stop_tears_down_the_subscription() {
    let harness = start(vec![fixtures::record("c1")]).await;
    harness.handle.stop().await.unwrap();
    sleep(Duration::from_millis(1)).await;

    assert!(!harness.transport.is_connected().await);
    assert!(harness.transport.joined_topics().await.is_empty());
}
