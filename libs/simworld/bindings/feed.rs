use super::event::EventBinding;
use crate::endpoints::Endpoint;
use crate::events::EventKind;
use crate::semantic::{expand, BubbleTiming, SemanticEvent};
use crate::WorldRegistry;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use tracing::debug;

type Sink = Arc<dyn Fn(SemanticEvent) + Send + Sync>;

/// Wire kinds that expand into semantic events, with their channel
const SEMANTIC_SOURCES: [(Endpoint, EventKind); 9] = [
    (Endpoint::Agents, EventKind::AgentsUpdate),
    (Endpoint::Agents, EventKind::AgentCreated),
    (Endpoint::Agents, EventKind::AgentDeleted),
    (Endpoint::Agents, EventKind::AgentMoved),
    (Endpoint::Agents, EventKind::AgentMoodChanged),
    (Endpoint::Agents, EventKind::AgentThought),
    (Endpoint::Agents, EventKind::AgentDialogue),
    (Endpoint::Environment, EventKind::EnvironmentUpdate),
    (Endpoint::Environment, EventKind::WeatherChanged),
];

/// Semantic events derived from the agents and environment channels
///
/// Each wire event is decoded and expanded with [`expand`]; the resulting
/// events reach the sink in order.
#[derive(Debug)]
pub struct SemanticFeed {
    bindings: Vec<EventBinding>,
}

impl SemanticFeed {
    /// Deliver semantic events to `callback`
    pub fn with_callback<F>(registry: &WorldRegistry, timing: BubbleTiming, callback: F, enabled: bool) -> Self
    where
        F: Fn(SemanticEvent) + Send + Sync + 'static,
    {
        Self::build(registry, timing, Arc::new(callback), enabled)
    }

    /// Deliver semantic events into an unbounded channel
    ///
    /// Events produced after the receiver is dropped are discarded.
    pub fn channel(registry: &WorldRegistry, timing: BubbleTiming, enabled: bool) -> (Self, Receiver<SemanticEvent>) {
        let (tx, rx): (Sender<SemanticEvent>, _) = crossbeam_channel::unbounded();
        let sink = move |event: SemanticEvent| {
            if tx.send(event).is_err() {
                debug!("Semantic event dropped, receiver gone");
            }
        };
        (Self::build(registry, timing, Arc::new(sink), enabled), rx)
    }

    fn build(registry: &WorldRegistry, timing: BubbleTiming, sink: Sink, enabled: bool) -> Self {
        let bindings = SEMANTIC_SOURCES
            .into_iter()
            .map(|(endpoint, kind)| {
                let sink = Arc::clone(&sink);
                EventBinding::wire(
                    registry,
                    endpoint,
                    kind,
                    move |event| {
                        for semantic in expand(&event, &timing) {
                            sink(semantic);
                        }
                    },
                    enabled,
                )
            })
            .collect();
        Self { bindings }
    }

    pub fn set_enabled(&self, enabled: bool) {
        for binding in &self.bindings {
            binding.set_enabled(enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bindings.iter().any(EventBinding::is_enabled)
    }
}
