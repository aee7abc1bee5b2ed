//! Unit tests for `WsManager` and the realtime fan-out.
//!
//! These drive the connection manager directly, without HTTP upgrades.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::extract::ws::Message;
use chrono::Utc;
use platepick_api::realtime::RealtimeRouter;
use platepick_api::ws::WsManager;
use platepick_core::decision::{Decision, DecisionMethod, DecisionScope, DecisionStatus};
use platepick_core::sync::FeedMessage;
use platepick_events::{DecisionEvent, DecisionEventKind, EventBus};

fn decision(id: i64, group_id: Option<i64>) -> Decision {
    let now = Utc::now();
    Decision {
        id,
        scope: if group_id.is_some() {
            DecisionScope::Group
        } else {
            DecisionScope::Personal
        },
        group_id,
        created_by: 1,
        collection_id: 7,
        method: DecisionMethod::Tiered,
        status: DecisionStatus::Active,
        deadline: Some(now + chrono::Duration::hours(24)),
        visit_date: now,
        participants: BTreeSet::from([1]),
        votes: BTreeMap::new(),
        result: None,
        created_at: now,
        updated_at: now,
    }
}

fn text_of(message: Message) -> String {
    match message {
        Message::Text(text) => text.as_str().to_owned(),
        other => panic!("expected text frame, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Connection bookkeeping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = WsManager::new();

    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn add_and_remove_track_group_counts() {
    let manager = WsManager::new();

    let _a = manager.add("conn-a".to_string(), 1).await;
    let _b = manager.add("conn-b".to_string(), 1).await;
    let _c = manager.add("conn-c".to_string(), 2).await;
    assert_eq!(manager.connection_count().await, 3);
    assert_eq!(manager.group_connection_count(1).await, 2);

    manager.remove("conn-a").await;
    manager.remove("nonexistent").await;
    assert_eq!(manager.group_connection_count(1).await, 1);
    assert_eq!(manager.connection_count().await, 2);
}

#[tokio::test]
async fn send_to_group_reaches_only_that_group() {
    let manager = WsManager::new();
    let mut rx_a = manager.add("conn-a".to_string(), 1).await;
    let mut rx_b = manager.add("conn-b".to_string(), 2).await;

    let delivered = manager.send_to_group(1, Message::Text("hello".into())).await;

    assert_eq!(delivered, 1);
    assert_eq!(text_of(rx_a.try_recv().unwrap()), "hello");
    assert!(rx_b.try_recv().is_err());
}

#[tokio::test]
async fn send_to_unknown_connection_returns_false() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-a".to_string(), 1).await;

    assert!(manager.send_to("conn-a", Message::Text("one".into())).await);
    assert!(!manager.send_to("conn-z", Message::Text("two".into())).await);
    assert_eq!(text_of(rx.try_recv().unwrap()), "one");
}

#[tokio::test]
async fn dropped_receiver_is_skipped_by_group_send() {
    let manager = WsManager::new();
    let rx = manager.add("conn-a".to_string(), 1).await;
    let _live = manager.add("conn-b".to_string(), 1).await;
    drop(rx);

    assert_eq!(manager.send_to_group(1, Message::Text("x".into())).await, 1);
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-a".to_string(), 1).await;

    manager.shutdown_all().await;

    assert!(matches!(rx.try_recv().unwrap(), Message::Close(None)));
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn ping_all_sends_ping_frames() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-a".to_string(), 1).await;

    manager.ping_all().await;

    assert!(matches!(rx.try_recv().unwrap(), Message::Ping(_)));
}

// ---------------------------------------------------------------------------
// Realtime routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn router_delivers_group_snapshot() {
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("conn-a".to_string(), 5).await;
    let router = RealtimeRouter::new(Arc::clone(&manager));

    let event = DecisionEvent::new(DecisionEventKind::VoteSubmitted, decision(11, Some(5)));
    assert_eq!(router.route_event(&event).await, 1);

    let parsed: FeedMessage = serde_json::from_str(&text_of(rx.try_recv().unwrap())).unwrap();
    let FeedMessage::DecisionSnapshot(snapshot) = parsed;
    assert_eq!(snapshot.id, 11);
    assert_eq!(snapshot.group_id, Some(5));
}

#[tokio::test]
async fn router_skips_personal_decisions() {
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("conn-a".to_string(), 5).await;
    let router = RealtimeRouter::new(Arc::clone(&manager));

    let event = DecisionEvent::new(DecisionEventKind::Created, decision(12, None));

    assert_eq!(router.route_event(&event).await, 0);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn router_loop_forwards_bus_events_and_stops_when_bus_drops() {
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("conn-a".to_string(), 5).await;
    let bus = EventBus::default();
    let handle = tokio::spawn(RealtimeRouter::new(Arc::clone(&manager)).run(bus.subscribe()));

    bus.publish(DecisionEvent::new(DecisionEventKind::Closed, decision(13, Some(5))));
    let message = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(text_of(message).contains("\"decision.snapshot\""));

    drop(bus);
    tokio::time::timeout(std::time::Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}
