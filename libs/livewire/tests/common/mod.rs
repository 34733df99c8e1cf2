//! Common test utilities for LiveWire integration tests
//!
//! Provides a scripted fake transport, a small JSON router and a mock
//! WebSocket server for the tungstenite tests.

#![allow(dead_code)]

use livewire::{
    Connector, Lifecycle, LiveWireError, MessageRouter, Result, Transport, TransportEvents,
    WsMessage,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

// ============================================================================
// JSON router
// ============================================================================

/// Parsed `{type, data}` frame
#[derive(Debug, Clone, PartialEq)]
pub struct JsonEvent {
    pub kind: String,
    pub data: Value,
}

/// Routes `{"type": ..., "data": ...}` frames on their `type`
pub struct JsonRouter;

impl MessageRouter for JsonRouter {
    type Message = JsonEvent;
    type RouteKey = String;

    fn parse(&self, message: &WsMessage) -> Result<JsonEvent> {
        let text = message
            .as_text()
            .ok_or_else(|| LiveWireError::Parse("binary frame".into()))?;
        let value: Value =
            serde_json::from_str(text).map_err(|e| LiveWireError::Parse(e.to_string()))?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| LiveWireError::Parse("missing type".into()))?
            .to_string();
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        Ok(JsonEvent { kind, data })
    }

    fn route_key(&self, message: &JsonEvent) -> String {
        message.kind.clone()
    }

    fn lifecycle(&self, event: Lifecycle) -> JsonEvent {
        let kind = match event {
            Lifecycle::Open => "connection_open",
            Lifecycle::Close => "connection_close",
            Lifecycle::Error => "connection_error",
        };
        JsonEvent {
            kind: kind.to_string(),
            data: Value::Null,
        }
    }
}

// ============================================================================
// Fake transport
// ============================================================================

/// Test-side view of one connection attempt made through [`FakeConnector`]
#[derive(Clone)]
pub struct FakeSocket {
    pub url: String,
    events: TransportEvents,
    sent: Arc<Mutex<Vec<WsMessage>>>,
    closed: Arc<AtomicBool>,
}

impl FakeSocket {
    /// Server accepted the connection
    pub fn open(&self) {
        self.events.open();
    }

    /// Server pushed a text frame
    pub fn push(&self, text: &str) {
        self.events.message(WsMessage::Text(text.to_string()));
    }

    /// Server pushed a binary frame
    pub fn push_binary(&self, data: Vec<u8>) {
        self.events.message(WsMessage::Binary(data));
    }

    /// Connection failed: error followed by close
    pub fn fail(&self, reason: &str) {
        self.events.error(reason);
        self.events.close(reason);
    }

    /// Connection closed (either side)
    pub fn close(&self) {
        self.events.close("");
    }

    /// Frames the manager wrote to this socket
    pub fn sent(&self) -> Vec<WsMessage> {
        self.sent.lock().clone()
    }

    /// Whether the manager asked this socket to close
    pub fn close_requested(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeTransport {
    sent: Arc<Mutex<Vec<WsMessage>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for FakeTransport {
    fn send(&mut self, message: WsMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(LiveWireError::ConnectionClosed("fake socket closed".into()));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector whose sockets are driven by the test
#[derive(Default)]
pub struct FakeConnector {
    sockets: Mutex<Vec<FakeSocket>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `open` calls so far
    pub fn attempts(&self) -> usize {
        self.sockets.lock().len()
    }

    /// The most recent connection attempt
    pub fn last(&self) -> FakeSocket {
        self.sockets
            .lock()
            .last()
            .cloned()
            .expect("no connection attempt yet")
    }

    /// Connection attempt number `index` (0-based)
    pub fn socket(&self, index: usize) -> FakeSocket {
        self.sockets.lock()[index].clone()
    }

    /// URLs of every attempt, in order
    pub fn urls(&self) -> Vec<String> {
        self.sockets.lock().iter().map(|s| s.url.clone()).collect()
    }
}

impl Connector for FakeConnector {
    fn open(&self, url: &str, events: TransportEvents) -> Box<dyn Transport> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.sockets.lock().push(FakeSocket {
            url: url.to_string(),
            events,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });
        Box::new(FakeTransport { sent, closed })
    }
}

/// Connector whose `open` blocks the calling thread for a while
pub struct SlowConnector {
    delay: Duration,
    opens: AtomicUsize,
}

impl SlowConnector {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            opens: AtomicUsize::new(0),
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Connector for SlowConnector {
    fn open(&self, _url: &str, _events: TransportEvents) -> Box<dyn Transport> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Box::new(FakeTransport {
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Connector that reports open (and any greeting frames) from inside `open`
#[derive(Default)]
pub struct EagerConnector {
    greeting: Vec<String>,
    opens: AtomicUsize,
    sent: Arc<Mutex<Vec<WsMessage>>>,
}

impl EagerConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Frames pushed right after the synchronous open
    pub fn with_greeting(greeting: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            greeting: greeting.iter().map(|g| g.to_string()).collect(),
            ..Self::default()
        })
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<WsMessage> {
        self.sent.lock().clone()
    }
}

impl Connector for EagerConnector {
    fn open(&self, _url: &str, events: TransportEvents) -> Box<dyn Transport> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        events.open();
        for frame in &self.greeting {
            events.message(WsMessage::Text(frame.clone()));
        }
        Box::new(FakeTransport {
            sent: Arc::clone(&self.sent),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Record every message delivered to a handler
pub fn recorder() -> (
    Arc<Mutex<Vec<JsonEvent>>>,
    impl Fn(&JsonEvent) -> Result<()> + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |event: &JsonEvent| {
        sink.lock().push(event.clone());
        Ok(())
    })
}

// ============================================================================
// Mock WebSocket server
// ============================================================================

/// A simple echo WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: watch::Sender<bool>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, mut stop) = watch::channel(false);
        let connection_stop = stop.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = connection_stop.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = stop.wait_for(|stopped| *stopped) => {
                        break;
                    }
                }
            }
        });

        Self { addr, shutdown }
    }

    async fn handle_connection(stream: tokio::net::TcpStream, mut shutdown: watch::Receiver<bool>) {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => {
                            if msg.is_text() || msg.is_binary() {
                                // Echo the message back
                                if write.send(msg).await.is_err() {
                                    break;
                                }
                            } else if msg.is_close() {
                                break;
                            }
                        }
                        Some(Err(_)) | None => break,
                    }
                }
                _ = async { let _ = shutdown.wait_for(|stopped| *stopped).await; } => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Shutdown the server and drop every open connection
    ///
    /// The flag is sticky, so tasks that have not been polled yet still
    /// observe it.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A `ws://` address nothing is listening on
pub async fn unreachable_ws_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until(timeout: std::time::Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
