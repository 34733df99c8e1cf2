//! Agent feed
//!
//! Binds the seven agent kinds on the agents channel to optional typed
//! callbacks. Kinds without a callback are not registered at all.

use super::event::EventBinding;
use crate::endpoints::Endpoint;
use crate::events::{Agent, AgentDialogue, AgentId, EventKind, WireEvent};
use crate::WorldRegistry;
use std::sync::Arc;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Optional callbacks, one per agent kind
#[derive(Default, Clone)]
pub struct AgentCallbacks {
    agents_update: Option<Callback<Vec<Agent>>>,
    agent_created: Option<Callback<Agent>>,
    agent_deleted: Option<Callback<AgentId>>,
    agent_moved: Option<Callback<(AgentId, f64, f64)>>,
    agent_mood_changed: Option<Callback<(AgentId, String)>>,
    agent_thought: Option<Callback<(AgentId, String)>>,
    agent_dialogue: Option<Callback<AgentDialogue>>,
}

impl AgentCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_agents_update(mut self, f: impl Fn(Vec<Agent>) + Send + Sync + 'static) -> Self {
        self.agents_update = Some(Arc::new(f));
        self
    }

    pub fn on_agent_created(mut self, f: impl Fn(Agent) + Send + Sync + 'static) -> Self {
        self.agent_created = Some(Arc::new(f));
        self
    }

    pub fn on_agent_deleted(mut self, f: impl Fn(AgentId) + Send + Sync + 'static) -> Self {
        self.agent_deleted = Some(Arc::new(f));
        self
    }

    pub fn on_agent_moved(mut self, f: impl Fn(AgentId, f64, f64) + Send + Sync + 'static) -> Self {
        self.agent_moved = Some(Arc::new(move |(id, x, y)| f(id, x, y)));
        self
    }

    pub fn on_agent_mood_changed(mut self, f: impl Fn(AgentId, String) + Send + Sync + 'static) -> Self {
        self.agent_mood_changed = Some(Arc::new(move |(id, mood)| f(id, mood)));
        self
    }

    pub fn on_agent_thought(mut self, f: impl Fn(AgentId, String) + Send + Sync + 'static) -> Self {
        self.agent_thought = Some(Arc::new(move |(id, thought)| f(id, thought)));
        self
    }

    pub fn on_agent_dialogue(mut self, f: impl Fn(AgentDialogue) + Send + Sync + 'static) -> Self {
        self.agent_dialogue = Some(Arc::new(f));
        self
    }

    /// Route one decoded event to its callback, if any
    fn deliver(&self, event: WireEvent) {
        match event {
            WireEvent::AgentsUpdate(update) => call(&self.agents_update, update.agents),
            WireEvent::AgentCreated(agent) => call(&self.agent_created, agent),
            WireEvent::AgentDeleted(deleted) => call(&self.agent_deleted, deleted.agent_id),
            WireEvent::AgentMoved(moved) => {
                call(&self.agent_moved, (moved.agent_id, moved.x, moved.y))
            }
            WireEvent::AgentMoodChanged(changed) => {
                call(&self.agent_mood_changed, (changed.agent_id, changed.mood))
            }
            WireEvent::AgentThought(thought) => {
                call(&self.agent_thought, (thought.agent_id, thought.thought))
            }
            WireEvent::AgentDialogue(dialogue) => call(&self.agent_dialogue, dialogue),
            _ => {}
        }
    }

    fn handles(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::AgentsUpdate => self.agents_update.is_some(),
            EventKind::AgentCreated => self.agent_created.is_some(),
            EventKind::AgentDeleted => self.agent_deleted.is_some(),
            EventKind::AgentMoved => self.agent_moved.is_some(),
            EventKind::AgentMoodChanged => self.agent_mood_changed.is_some(),
            EventKind::AgentThought => self.agent_thought.is_some(),
            EventKind::AgentDialogue => self.agent_dialogue.is_some(),
            _ => false,
        }
    }
}

fn call<T>(callback: &Option<Callback<T>>, value: T) {
    if let Some(callback) = callback {
        callback(value);
    }
}

/// Typed agent callbacks bound to the agents channel
#[derive(Debug)]
pub struct AgentFeed {
    bindings: Vec<EventBinding>,
}

impl AgentFeed {
    pub fn new(registry: &WorldRegistry, callbacks: AgentCallbacks, enabled: bool) -> Self {
        let callbacks = Arc::new(callbacks);
        let bindings = EventKind::AGENT_KINDS
            .into_iter()
            .filter(|kind| callbacks.handles(*kind))
            .map(|kind| {
                let callbacks = Arc::clone(&callbacks);
                EventBinding::wire(
                    registry,
                    Endpoint::Agents,
                    kind,
                    move |event| callbacks.deliver(event),
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

    /// Kinds this feed has a callback for
    pub fn kinds(&self) -> Vec<EventKind> {
        self.bindings.iter().map(EventBinding::kind).collect()
    }
}
