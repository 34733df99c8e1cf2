//! Common test utilities for SimWorld integration tests

#![allow(dead_code)]

use livewire::{Connector, Transport, TransportEvents, WsMessage};
use parking_lot::Mutex;
use serde_json::{json, Value};
use simworld::{registry_with_connector, RealtimeConfig, WorldRegistry};
use std::sync::Arc;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

pub const BASE_URL: &str = "ws://sim.test";

/// One connection attempt, driven by the test
#[derive(Clone)]
pub struct FakeSocket {
    pub url: String,
    events: TransportEvents,
    sent: Arc<Mutex<Vec<WsMessage>>>,
}

impl FakeSocket {
    pub fn open(&self) {
        self.events.open();
    }

    pub fn push(&self, text: &str) {
        self.events.message(WsMessage::Text(text.to_string()));
    }

    /// Push `{"type": kind, "data": data}`
    pub fn push_event(&self, kind: &str, data: Value) {
        self.push(&json!({ "type": kind, "data": data }).to_string());
    }

    pub fn fail(&self, reason: &str) {
        self.events.error(reason);
        self.events.close(reason);
    }

    /// Outbound frames as parsed JSON
    pub fn sent_json(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| m.as_text().and_then(|t| serde_json::from_str(t).ok()))
            .collect()
    }
}

struct FakeTransport {
    sent: Arc<Mutex<Vec<WsMessage>>>,
}

impl Transport for FakeTransport {
    fn send(&mut self, message: WsMessage) -> livewire::Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }

    fn close(&mut self) {}
}

#[derive(Default)]
pub struct FakeConnector {
    sockets: Mutex<Vec<FakeSocket>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Attempts made against `url`
    pub fn attempts_for(&self, url: &str) -> usize {
        self.sockets.lock().iter().filter(|s| s.url == url).count()
    }

    /// Most recent attempt against `url`
    pub fn last_for(&self, url: &str) -> FakeSocket {
        self.sockets
            .lock()
            .iter()
            .rev()
            .find(|s| s.url == url)
            .cloned()
            .expect("no connection attempt for url")
    }
}

impl Connector for FakeConnector {
    fn open(&self, url: &str, events: TransportEvents) -> Box<dyn Transport> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.sockets.lock().push(FakeSocket {
            url: url.to_string(),
            events,
            sent: Arc::clone(&sent),
        });
        Box::new(FakeTransport { sent })
    }
}

pub fn test_config(max_reconnect_attempts: usize) -> RealtimeConfig {
    RealtimeConfig {
        ws_url: BASE_URL.to_string(),
        reconnect_interval_ms: 100,
        max_reconnect_attempts,
        ..RealtimeConfig::default()
    }
}

/// Registry over a fresh fake connector
pub fn fake_registry(max_reconnect_attempts: usize) -> (WorldRegistry, Arc<FakeConnector>) {
    let connector = FakeConnector::new();
    let registry = registry_with_connector(&test_config(max_reconnect_attempts), connector.clone());
    (registry, connector)
}

pub fn agents_url() -> String {
    format!("{}/ws/agents", BASE_URL)
}

pub fn environment_url() -> String {
    format!("{}/ws/environment", BASE_URL)
}
