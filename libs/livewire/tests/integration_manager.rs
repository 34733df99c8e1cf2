//! Integration tests for the connection manager state machine
//!
//! Every test drives the manager through a scripted fake transport; reconnect
//! timers run on tokio's paused clock.

mod common;

use common::{recorder, EagerConnector, FakeConnector, JsonRouter, SlowConnector};
use livewire::{
    ChannelConfig, ConnectionManager, ConnectionState, LiveWireError, ReconnectPolicy, WsMessage,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const URL: &str = "ws://host/ws/agents";

fn manager_with(
    policy: ReconnectPolicy,
) -> (ConnectionManager<JsonRouter>, Arc<FakeConnector>) {
    let connector = FakeConnector::new();
    let manager = ConnectionManager::new(
        ChannelConfig::new(URL).with_reconnect(policy),
        Arc::new(JsonRouter),
        connector.clone(),
    );
    (manager, connector)
}

fn manager() -> (ConnectionManager<JsonRouter>, Arc<FakeConnector>) {
    manager_with(ReconnectPolicy::new(Duration::from_millis(100), 10))
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test]
async fn test_new_manager_is_idle() {
    let (manager, connector) = manager();

    assert_eq!(manager.state(), ConnectionState::Idle);
    assert_eq!(manager.url(), URL);
    assert_eq!(connector.attempts(), 0);
}

#[tokio::test]
async fn test_duplicate_connect_is_noop() {
    verbose_println!("Testing duplicate connect...");
    let (manager, connector) = manager();

    manager.connect();
    manager.connect();
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.state(), ConnectionState::Connecting);

    connector.last().open();
    manager.connect();
    assert_eq!(connector.attempts(), 1);
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(connector.urls(), vec![URL.to_string()]);
}

#[tokio::test]
async fn test_lifecycle_events_are_dispatched() {
    let (manager, connector) = manager();
    let (opened, on_open) = recorder();
    let (errors, on_error) = recorder();
    let (closed, on_close) = recorder();
    let _a = manager.on("connection_open".into(), on_open);
    let _b = manager.on("connection_error".into(), on_error);
    let _c = manager.on("connection_close".into(), on_close);

    manager.connect();
    let socket = connector.last();
    socket.open();
    assert_eq!(opened.lock().len(), 1);
    assert_eq!(opened.lock()[0].data, serde_json::Value::Null);

    socket.fail("connection reset");
    assert_eq!(errors.lock().len(), 1);
    assert_eq!(closed.lock().len(), 1);
    assert_eq!(manager.state(), ConnectionState::Reconnecting);
}

#[tokio::test]
async fn test_frames_reach_matching_handlers() {
    let (manager, connector) = manager();
    let (created, on_created) = recorder();
    let _sub = manager.on("agent_created".into(), on_created);

    manager.connect();
    let socket = connector.last();
    socket.open();
    socket.push(r#"{"type":"agent_created","data":{"id":7,"name":"Mira"}}"#);

    let created = created.lock();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].data, json!({"id": 7, "name": "Mira"}));
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    verbose_println!("Testing malformed frame handling...");
    let (manager, connector) = manager();
    let (seen, on_any) = recorder();
    let _sub = manager.on("agent_created".into(), on_any);

    manager.connect();
    let socket = connector.last();
    socket.open();

    socket.push("not json at all");
    socket.push(r#"{"data":{"id":1}}"#);
    socket.push(r#"{"type":42}"#);
    socket.push_binary(vec![0x7b, 0x7d]);

    assert!(seen.lock().is_empty());
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(manager.metrics().messages_received, 4);

    socket.push(r#"{"type":"agent_created","data":null}"#);
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_send_only_reaches_open_transport() {
    let (manager, connector) = manager();

    manager.send(WsMessage::from("before connect"));
    manager.connect();
    let socket = connector.last();
    manager.send(WsMessage::from("while connecting"));
    assert!(socket.sent().is_empty());

    socket.open();
    manager.send(WsMessage::from("hello"));
    assert_eq!(socket.sent(), vec![WsMessage::from("hello")]);
    assert_eq!(manager.metrics().messages_sent, 1);

    socket.close();
    manager.send(WsMessage::from("after close"));
    assert_eq!(socket.sent().len(), 1);
    assert_eq!(manager.metrics().messages_sent, 1);
}

#[tokio::test]
async fn test_handler_failure_does_not_affect_siblings() {
    let (manager, connector) = manager();
    let (seen, on_tick) = recorder();

    let _err = manager.on("tick".into(), |_| Err(LiveWireError::Handler("boom".into())));
    let _panic = manager.on("tick".into(), |_| -> livewire::Result<()> { panic!("bad handler") });
    let _ok = manager.on("tick".into(), on_tick);

    manager.connect();
    let socket = connector.last();
    socket.open();
    socket.push(r#"{"type":"tick","data":1}"#);
    socket.push(r#"{"type":"tick","data":2}"#);

    let data: Vec<_> = seen.lock().iter().map(|e| e.data.clone()).collect();
    assert_eq!(data, vec![json!(1), json!(2)]);
    assert_eq!(manager.state(), ConnectionState::Open);
}

#[tokio::test]
async fn test_mixed_frames_preserve_order_per_type() {
    verbose_println!("Testing FIFO dispatch of mixed frames...");
    let (manager, connector) = manager();
    let (moved, on_moved) = recorder();
    let (deleted, on_deleted) = recorder();
    let _a = manager.on("agent_moved".into(), on_moved);
    let _b = manager.on("agent_deleted".into(), on_deleted);

    manager.connect();
    let socket = connector.last();
    socket.open();

    socket.push(r#"{"type":"agent_moved","data":{"agentId":1,"x":10,"y":20}}"#);
    socket.push(r#"{"type":"agent_deleted","data":{"agentId":2}}"#);
    socket.push(r#"{"type":"agent_moved","data":{"agentId":3,"x":30,"y":40}}"#);
    socket.push(r#"{"type":"agent_thought","data":{"agentId":1,"thought":"hm"}}"#);
    socket.push(r#"{"type":"agent_moved","data":{"agentId":4,"x":50,"y":60}}"#);

    let moved_ids: Vec<_> = moved.lock().iter().map(|e| e.data["agentId"].clone()).collect();
    let deleted_ids: Vec<_> = deleted.lock().iter().map(|e| e.data["agentId"].clone()).collect();
    assert_eq!(moved_ids, vec![json!(1), json!(3), json!(4)]);
    assert_eq!(deleted_ids, vec![json!(2)]);
}

#[tokio::test]
async fn test_unsubscribed_handler_is_never_invoked() {
    let (manager, connector) = manager();
    let (seen, on_tick) = recorder();
    let sub = manager.on("tick".into(), on_tick);

    manager.connect();
    let socket = connector.last();
    socket.open();
    socket.push(r#"{"type":"tick"}"#);
    sub.unsubscribe();
    socket.push(r#"{"type":"tick"}"#);

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(manager.dispatcher().handler_count(&"tick".to_string()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_close_schedules_reconnect() {
    let (manager, connector) = manager();

    manager.connect();
    connector.last().open();
    connector.last().close();

    assert_eq!(manager.state(), ConnectionState::Reconnecting);
    assert_eq!(manager.reconnect_attempts(), 1);
    assert!(manager.has_pending_reconnect());
    assert_eq!(connector.attempts(), 1);

    advance(50).await;
    assert_eq!(connector.attempts(), 1);

    advance(60).await;
    assert_eq!(connector.attempts(), 2);
    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert!(!manager.has_pending_reconnect());
}

#[tokio::test(start_paused = true)]
async fn test_successful_open_resets_attempts() {
    let (manager, connector) = manager();

    manager.connect();
    connector.last().close();
    advance(110).await;
    connector.last().close();
    advance(110).await;
    assert_eq!(manager.reconnect_attempts(), 2);

    connector.last().open();
    assert_eq!(manager.reconnect_attempts(), 0);
    assert_eq!(manager.state(), ConnectionState::Open);

    connector.last().close();
    assert_eq!(manager.reconnect_attempts(), 1);
    assert_eq!(manager.metrics().reconnect_count, 3);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_budget_is_capped() {
    verbose_println!("Testing reconnect budget with max_attempts = 2...");
    let (manager, connector) = manager_with(ReconnectPolicy::new(Duration::from_millis(100), 2));

    manager.connect();
    for close in 1..=3 {
        connector.last().close();
        verbose_println!(
            "  close #{}: state={} attempts={}",
            close,
            manager.state(),
            manager.reconnect_attempts()
        );
        advance(110).await;
    }

    assert_eq!(connector.attempts(), 3);
    assert_eq!(manager.reconnect_attempts(), 2);
    assert_eq!(manager.metrics().reconnect_count, 2);
    assert_eq!(manager.state(), ConnectionState::Stopped);
    assert!(!manager.has_pending_reconnect());

    advance(10_000).await;
    assert_eq!(connector.attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_manual_connect_after_budget_exhausted() {
    let (manager, connector) = manager_with(ReconnectPolicy::never());

    manager.connect();
    connector.last().close();
    assert_eq!(manager.state(), ConnectionState::Stopped);

    manager.connect();
    assert_eq!(connector.attempts(), 2);
    connector.last().open();
    assert!(manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    let (manager, connector) = manager();

    manager.connect();
    connector.last().open();
    connector.last().close();
    assert!(manager.has_pending_reconnect());

    manager.disconnect();
    assert!(!manager.has_pending_reconnect());
    assert!(manager.is_intentionally_closed());
    assert_eq!(manager.state(), ConnectionState::Stopped);

    advance(5_000).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_close_does_not_reconnect() {
    let (manager, connector) = manager();
    let (closed, on_close) = recorder();
    let _sub = manager.on("connection_close".into(), on_close);

    manager.connect();
    let socket = connector.last();
    socket.open();

    manager.disconnect();
    assert!(socket.close_requested());

    // Transport acknowledges the close afterwards
    socket.close();
    assert_eq!(closed.lock().len(), 1);
    assert_eq!(manager.state(), ConnectionState::Stopped);
    assert!(!manager.has_pending_reconnect());

    advance(5_000).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_handler_may_disconnect_on_close() {
    let (manager, connector) = manager();
    let handle = manager.clone();
    let _sub = manager.on("connection_close".into(), move |_| {
        handle.disconnect();
        Ok(())
    });

    manager.connect();
    connector.last().close();

    assert_eq!(manager.state(), ConnectionState::Stopped);
    advance(5_000).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_connect_supersedes_pending_timer() {
    let (manager, connector) = manager();

    manager.connect();
    connector.last().close();
    assert!(manager.has_pending_reconnect());

    manager.connect();
    assert_eq!(connector.attempts(), 2);
    assert!(!manager.has_pending_reconnect());

    advance(5_000).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stale_transport_events_are_ignored() {
    let (manager, connector) = manager();
    let (seen, on_tick) = recorder();
    let _sub = manager.on("tick".into(), on_tick);

    manager.connect();
    let old = connector.last();
    old.close();
    manager.connect();
    let current = connector.last();
    current.open();

    old.close();
    old.push(r#"{"type":"tick"}"#);
    assert_eq!(manager.state(), ConnectionState::Open);
    assert!(seen.lock().is_empty());

    current.push(r#"{"type":"tick"}"#);
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn test_handlers_can_reenter_manager() {
    let (manager, connector) = manager();
    let replies = Arc::new(AtomicUsize::new(0));
    let handle = manager.clone();
    let count = Arc::clone(&replies);
    let _sub = manager.on("ping".into(), move |_| {
        handle.send(WsMessage::from(r#"{"type":"pong"}"#));
        let _nested = handle.on("later".into(), |_| Ok(()));
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    manager.connect();
    let socket = connector.last();
    socket.open();
    socket.push(r#"{"type":"ping"}"#);

    assert_eq!(replies.load(Ordering::SeqCst), 1);
    assert_eq!(socket.sent().len(), 1);
}

#[test]
fn test_close_without_runtime_stops() {
    let (manager, connector) = manager();

    manager.connect();
    connector.last().close();

    assert_eq!(manager.state(), ConnectionState::Stopped);
    assert!(!manager.has_pending_reconnect());
}

// ============================================================================
// Connect while the transport is being installed
// ============================================================================

#[test]
fn test_connect_during_slow_open_is_noop() {
    let connector = SlowConnector::new(Duration::from_millis(100));
    let manager = ConnectionManager::new(ChannelConfig::new(URL), Arc::new(JsonRouter), connector.clone());

    let first = manager.clone();
    let opener = std::thread::spawn(move || first.connect());
    std::thread::sleep(Duration::from_millis(20));
    manager.connect();
    opener.join().unwrap();

    assert_eq!(connector.opens(), 1);
    assert_eq!(manager.state(), ConnectionState::Connecting);
}

#[test]
fn test_synchronous_open_handler_can_connect_and_send() {
    let connector = EagerConnector::new();
    let manager = ConnectionManager::new(ChannelConfig::new(URL), Arc::new(JsonRouter), connector.clone());
    let opened = Arc::new(AtomicUsize::new(0));

    let handle = manager.clone();
    let count = Arc::clone(&opened);
    let _sub = manager.on("connection_open".into(), move |_| {
        count.fetch_add(1, Ordering::SeqCst);
        handle.connect();
        handle.send(WsMessage::from(r#"{"type":"hello"}"#));
        Ok(())
    });

    manager.connect();

    assert_eq!(connector.opens(), 1);
    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(connector.sent(), vec![WsMessage::from(r#"{"type":"hello"}"#)]);
    assert_eq!(manager.metrics().messages_sent, 1);
}

#[test]
fn test_synchronous_events_keep_their_order() {
    let connector = EagerConnector::with_greeting(&[r#"{"type":"welcome","data":1}"#]);
    let manager = ConnectionManager::new(ChannelConfig::new(URL), Arc::new(JsonRouter), connector.clone());
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let subs: Vec<_> = ["connection_open", "welcome"]
        .into_iter()
        .map(|kind| {
            let order = Arc::clone(&order);
            manager.on(kind.to_string(), move |event| {
                order.lock().push(event.kind.clone());
                Ok(())
            })
        })
        .collect();

    manager.connect();
    verbose_println!("  delivery order: {:?}", order.lock());

    assert_eq!(*order.lock(), vec!["connection_open".to_string(), "welcome".to_string()]);
    assert_eq!(manager.metrics().messages_received, 1);
    drop(subs);
}
