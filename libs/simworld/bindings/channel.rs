use crate::endpoints::Endpoint;
use crate::events::{EventKind, OutgoingMessage};
use crate::{WorldChannel, WorldRegistry};
use livewire::Subscription;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;

/// Typed send helpers for world channels
pub trait WorldChannelExt {
    /// Send `{"type": kind, "data": data}`; dropped with a log while not open
    fn send_event(&self, kind: &str, data: Value);

    /// Send any serializable payload under `kind`
    fn send_payload<T: Serialize>(&self, kind: &str, payload: &T);
}

impl WorldChannelExt for WorldChannel {
    fn send_event(&self, kind: &str, data: Value) {
        match OutgoingMessage::new(kind, data).to_frame() {
            Ok(frame) => self.send(frame),
            Err(e) => error!(kind, "Failed to serialize outgoing message: {}", e),
        }
    }

    fn send_payload<T: Serialize>(&self, kind: &str, payload: &T) {
        match OutgoingMessage::with_payload(kind, payload).and_then(|m| m.to_frame()) {
            Ok(frame) => self.send(frame),
            Err(e) => error!(kind, "Failed to serialize outgoing message: {}", e),
        }
    }
}

/// A consumer's hold on one channel
///
/// Tracks connectedness from the lifecycle events and optionally connects
/// the channel. Dropping the binding removes its registrations but never
/// disconnects the channel, since other consumers may still use it.
pub struct ChannelBinding {
    endpoint: Endpoint,
    channel: WorldChannel,
    connected: Arc<AtomicBool>,
    _subscriptions: [Subscription; 3],
}

impl ChannelBinding {
    pub fn new(registry: &WorldRegistry, endpoint: Endpoint, auto_connect: bool) -> Self {
        let channel = registry.get(endpoint.path());
        let connected = Arc::new(AtomicBool::new(channel.is_connected()));

        let track = |kind: EventKind, value: bool| {
            let connected = Arc::clone(&connected);
            channel.on(kind, move |_| {
                connected.store(value, Ordering::Release);
                Ok(())
            })
        };
        let subscriptions = [
            track(EventKind::ConnectionOpen, true),
            track(EventKind::ConnectionClose, false),
            track(EventKind::ConnectionError, false),
        ];

        if auto_connect {
            channel.connect();
        }

        Self {
            endpoint,
            channel,
            connected,
            _subscriptions: subscriptions,
        }
    }

    /// Whether the channel was open as of the last lifecycle event
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn channel(&self) -> &WorldChannel {
        &self.channel
    }

    pub fn send_event(&self, kind: &str, data: Value) {
        self.channel.send_event(kind, data);
    }
}

impl std::fmt::Debug for ChannelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .finish()
    }
}
