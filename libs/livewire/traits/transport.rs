//! Transport abstraction
//!
//! A connection manager drives exactly one transport at a time through three
//! outbound operations (`Connector::open`, `Transport::send`,
//! `Transport::close`) and learns about it through four inbound notifications
//! (`TransportEvent`). Nothing here blocks: `open` returns immediately and the
//! outcome arrives later through the `TransportEvents` sink.

use crate::{Result, WsMessage};
use std::sync::Weak;
use tracing::trace;

/// Inbound notification from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established
    Open,
    /// A frame arrived
    Message(WsMessage),
    /// The transport failed; a `Close` follows
    Error(String),
    /// The connection is gone (reason may be empty)
    Close(String),
}

/// Opens physical connections
///
/// Implementations must not block the caller: spawn whatever I/O is needed
/// and report progress through `events`. Notifications reported before
/// `open` returns are held back until the returned transport is installed.
pub trait Connector: Send + Sync + 'static {
    /// Start connecting to `url` and return a handle for writing/closing
    fn open(&self, url: &str, events: TransportEvents) -> Box<dyn Transport>;
}

/// Write half of one physical connection, exclusively owned by its manager
pub trait Transport: Send + 'static {
    /// Queue a frame for sending
    ///
    /// Called with the manager's state lock held, so it must not report
    /// through `TransportEvents` synchronously.
    fn send(&mut self, message: WsMessage) -> Result<()>;

    /// Start closing the connection; a `Close` notification follows
    fn close(&mut self);
}

/// Receiver side of transport notifications, implemented by the manager
pub(crate) trait TransportListener: Send + Sync {
    fn on_transport_event(&self, generation: u64, event: TransportEvent);
}

/// Sink a connector reports notifications into
///
/// Each sink is bound to one connection attempt. Once the manager has moved
/// on to a newer attempt, notifications from older sinks are ignored, and
/// once the manager is dropped they go nowhere.
#[derive(Clone)]
pub struct TransportEvents {
    listener: Weak<dyn TransportListener>,
    generation: u64,
}

impl TransportEvents {
    pub(crate) fn new(listener: Weak<dyn TransportListener>, generation: u64) -> Self {
        Self {
            listener,
            generation,
        }
    }

    /// The connection attempt this sink belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver a notification
    ///
    /// Returns `false` when the owning manager no longer exists.
    pub fn emit(&self, event: TransportEvent) -> bool {
        match self.listener.upgrade() {
            Some(listener) => {
                listener.on_transport_event(self.generation, event);
                true
            }
            None => {
                trace!(generation = self.generation, "Transport event dropped, manager gone");
                false
            }
        }
    }

    pub fn open(&self) -> bool {
        self.emit(TransportEvent::Open)
    }

    pub fn message(&self, message: WsMessage) -> bool {
        self.emit(TransportEvent::Message(message))
    }

    pub fn error(&self, reason: impl Into<String>) -> bool {
        self.emit(TransportEvent::Error(reason.into()))
    }

    pub fn close(&self, reason: impl Into<String>) -> bool {
        self.emit(TransportEvent::Close(reason.into()))
    }
}

impl std::fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportEvents")
            .field("generation", &self.generation)
            .field("attached", &(self.listener.strong_count() > 0))
            .finish()
    }
}
