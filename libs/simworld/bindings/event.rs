use crate::endpoints::Endpoint;
use crate::events::{Envelope, EventKind, WireEvent};
use crate::{WorldChannel, WorldRegistry};
use livewire::{LiveWireError, Subscription};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

type EnvelopeHandler = Arc<dyn Fn(&Envelope) -> livewire::Result<()> + Send + Sync>;

/// One event kind on one channel, bound to a callback
///
/// While enabled the callback is registered and the channel is asked to
/// connect; while disabled no registration exists. Disabling never
/// disconnects the channel. Dropping the binding unregisters the callback.
pub struct EventBinding {
    endpoint: Endpoint,
    kind: EventKind,
    channel: WorldChannel,
    handler: EnvelopeHandler,
    subscription: Mutex<Option<Subscription>>,
}

impl EventBinding {
    /// Bind a raw envelope callback
    pub fn new<F>(registry: &WorldRegistry, endpoint: Endpoint, kind: EventKind, handler: F, enabled: bool) -> Self
    where
        F: Fn(&Envelope) -> livewire::Result<()> + Send + Sync + 'static,
    {
        let binding = Self {
            endpoint,
            kind,
            channel: registry.get(endpoint.path()),
            handler: Arc::new(handler),
            subscription: Mutex::new(None),
        };
        binding.set_enabled(enabled);
        binding
    }

    /// Bind a callback receiving the payload decoded as `T`
    ///
    /// A payload that does not decode is logged and skipped for this
    /// binding only.
    pub fn typed<T, F>(registry: &WorldRegistry, endpoint: Endpoint, kind: EventKind, handler: F, enabled: bool) -> Self
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::new(
            registry,
            endpoint,
            kind,
            move |envelope: &Envelope| {
                let payload = envelope.data_as::<T>().map_err(|e| {
                    LiveWireError::Parse(format!("invalid {} payload: {}", envelope.kind, e))
                })?;
                handler(payload);
                Ok(())
            },
            enabled,
        )
    }

    /// Bind a callback receiving the decoded [`WireEvent`]
    pub fn wire<F>(registry: &WorldRegistry, endpoint: Endpoint, kind: EventKind, handler: F, enabled: bool) -> Self
    where
        F: Fn(WireEvent) + Send + Sync + 'static,
    {
        Self::new(
            registry,
            endpoint,
            kind,
            move |envelope: &Envelope| {
                let event =
                    WireEvent::decode(envelope).map_err(|e| LiveWireError::Parse(e.to_string()))?;
                handler(event);
                Ok(())
            },
            enabled,
        )
    }

    /// Turn the registration on or off
    pub fn set_enabled(&self, enabled: bool) {
        let mut subscription = self.subscription.lock();
        match (enabled, subscription.is_some()) {
            (true, false) => {
                let handler = Arc::clone(&self.handler);
                *subscription = Some(self.channel.on(self.kind, move |envelope| handler(envelope)));
                drop(subscription);
                debug!(endpoint = %self.endpoint, kind = %self.kind, "Event binding enabled");
                self.channel.connect();
            }
            (false, true) => {
                if let Some(sub) = subscription.take() {
                    sub.unsubscribe();
                }
                debug!(endpoint = %self.endpoint, kind = %self.kind, "Event binding disabled");
            }
            _ => {}
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn channel(&self) -> &WorldChannel {
        &self.channel
    }
}

impl std::fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBinding")
            .field("endpoint", &self.endpoint)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
