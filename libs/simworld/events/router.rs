use super::envelope::Envelope;
use super::kind::EventKind;
use livewire::{Lifecycle, LiveWireError, MessageRouter, WsMessage};
use tracing::trace;

/// Router for world-simulation channels
///
/// Frames become [`Envelope`]s keyed by their [`EventKind`]; payloads stay
/// raw JSON until a consumer decodes them, so one consumer's shape
/// expectations never affect another's.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldRouter;

impl WorldRouter {
    pub fn new() -> Self {
        Self
    }
}

impl MessageRouter for WorldRouter {
    type Message = Envelope;
    type RouteKey = EventKind;

    fn parse(&self, message: &WsMessage) -> livewire::Result<Envelope> {
        let envelope =
            Envelope::from_frame(message).map_err(|e| LiveWireError::Parse(e.to_string()))?;
        trace!(kind = %envelope.kind, "Parsed envelope");
        Ok(envelope)
    }

    fn route_key(&self, message: &Envelope) -> EventKind {
        message.kind
    }

    fn lifecycle(&self, event: Lifecycle) -> Envelope {
        let kind = match event {
            Lifecycle::Open => EventKind::ConnectionOpen,
            Lifecycle::Close => EventKind::ConnectionClose,
            Lifecycle::Error => EventKind::ConnectionError,
        };
        Envelope::lifecycle(kind)
    }
}
