use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle state of a connection manager
///
/// ```text
/// Idle ──connect()──> Connecting ──open──> Open
///                         │                 │
///                         └──────close──────┤
///                                           ▼
///               Reconnecting <──(budget left)── close ──(budget spent / disconnect())──> Stopped
///                    │
///                    └──timer──> Connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, never connected
    Idle,
    /// A transport is being opened
    Connecting,
    /// The transport is open; frames flow
    Open,
    /// Closed unexpectedly; a reconnect timer is pending
    Reconnecting,
    /// Closed and not coming back until `connect()` is called again
    Stopped,
}

impl ConnectionState {
    /// A transport exists and is either opening or open
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free counters kept by each manager
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

/// Metrics snapshot for one manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    /// Reconnects scheduled over the manager's whole lifetime
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}
