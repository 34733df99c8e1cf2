//! World Events
//!
//! Event kinds, the `{type, data, timestamp?}` envelope, typed payloads and
//! the router that plugs them into `livewire`.

pub mod envelope;
pub mod kind;
pub mod payloads;
pub mod router;

pub use envelope::{Envelope, EnvelopeError, OutgoingMessage};
pub use kind::{EventKind, UnknownEventKind};
pub use payloads::{
    parse_timestamp, Agent, AgentCreated, AgentDeleted, AgentDialogue, AgentId, AgentMoodChanged,
    AgentMoved, AgentThought, AgentsUpdate, DialogueMessage, EnvironmentState, Memory,
    PayloadError, Point, PointsUpdate, Relationship, TimeUpdate, WireEvent, WorldEvent,
};
pub use router::WorldRouter;
