//! Typed payloads
//!
//! [`WireEvent`] is the decoded form of an [`Envelope`]: one variant per
//! event kind, each carrying the payload shape the server sends for it.

use super::envelope::Envelope;
use super::kind::EventKind;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical agent identifier
pub type AgentId = i64;

/// Payload did not match the shape expected for its kind
#[derive(Error, Debug)]
#[error("invalid {kind} payload: {source}")]
pub struct PayloadError {
    pub kind: EventKind,
    #[source]
    pub source: serde_json::Error,
}

fn default_coordinate() -> f64 {
    50.0
}

/// Parse a server timestamp; naive timestamps are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub agent_type: Option<String>,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub current_plan: Option<String>,
    /// Missing positions default to the map centre
    #[serde(default = "default_coordinate")]
    pub x: f64,
    #[serde(default = "default_coordinate")]
    pub y: f64,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Agent {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentsUpdate {
    pub agents: Vec<Agent>,
}

/// `agent_created` arrives either wrapped (`{"agent": {...}}`) or bare
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AgentCreated {
    Wrapped { agent: Agent },
    Bare(Agent),
}

impl AgentCreated {
    pub fn into_agent(self) -> Agent {
        match self {
            AgentCreated::Wrapped { agent } | AgentCreated::Bare(agent) => agent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDeleted {
    pub agent_id: AgentId,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMoved {
    pub agent_id: AgentId,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMoodChanged {
    pub agent_id: AgentId,
    pub mood: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentThought {
    pub agent_id: AgentId,
    pub thought: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDialogue {
    pub agent_id1: AgentId,
    pub name1: String,
    pub agent_id2: AgentId,
    pub name2: String,
    #[serde(default)]
    pub messages: Vec<DialogueMessage>,
}

/// `environment_update` and `weather_changed` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnvironmentState {
    pub weather: String,
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeUpdate {
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldEvent {
    pub id: i64,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub agent_from_id: AgentId,
    pub agent_to_id: AgentId,
    pub sympathy: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Memory {
    pub id: i64,
    pub agent_id: AgentId,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointsUpdate {
    pub points: Vec<Point>,
}

/// Decoded wire event, one variant per [`EventKind`]
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    ConnectionOpen,
    ConnectionClose,
    ConnectionError,
    AgentsUpdate(AgentsUpdate),
    AgentCreated(Agent),
    AgentDeleted(AgentDeleted),
    AgentMoved(AgentMoved),
    AgentMoodChanged(AgentMoodChanged),
    AgentThought(AgentThought),
    AgentDialogue(AgentDialogue),
    EnvironmentUpdate(EnvironmentState),
    WeatherChanged(EnvironmentState),
    TimeUpdated(TimeUpdate),
    EventCreated(WorldEvent),
    RelationshipUpdate(Relationship),
    MemoryCreated(Memory),
    PointsUpdate(PointsUpdate),
}

impl WireEvent {
    /// Decode the payload of `envelope` according to its kind
    pub fn decode(envelope: &Envelope) -> Result<Self, PayloadError> {
        let event = match envelope.kind {
            EventKind::ConnectionOpen => WireEvent::ConnectionOpen,
            EventKind::ConnectionClose => WireEvent::ConnectionClose,
            EventKind::ConnectionError => WireEvent::ConnectionError,
            EventKind::AgentsUpdate => WireEvent::AgentsUpdate(payload(envelope)?),
            EventKind::AgentCreated => {
                WireEvent::AgentCreated(payload::<AgentCreated>(envelope)?.into_agent())
            }
            EventKind::AgentDeleted => WireEvent::AgentDeleted(payload(envelope)?),
            EventKind::AgentMoved => WireEvent::AgentMoved(payload(envelope)?),
            EventKind::AgentMoodChanged => WireEvent::AgentMoodChanged(payload(envelope)?),
            EventKind::AgentThought => WireEvent::AgentThought(payload(envelope)?),
            EventKind::AgentDialogue => WireEvent::AgentDialogue(payload(envelope)?),
            EventKind::EnvironmentUpdate => WireEvent::EnvironmentUpdate(payload(envelope)?),
            EventKind::WeatherChanged => WireEvent::WeatherChanged(payload(envelope)?),
            EventKind::TimeUpdated => WireEvent::TimeUpdated(payload(envelope)?),
            EventKind::EventCreated => WireEvent::EventCreated(payload(envelope)?),
            EventKind::RelationshipUpdate => WireEvent::RelationshipUpdate(payload(envelope)?),
            EventKind::MemoryCreated => WireEvent::MemoryCreated(payload(envelope)?),
            EventKind::PointsUpdate => WireEvent::PointsUpdate(payload(envelope)?),
        };
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            WireEvent::ConnectionOpen => EventKind::ConnectionOpen,
            WireEvent::ConnectionClose => EventKind::ConnectionClose,
            WireEvent::ConnectionError => EventKind::ConnectionError,
            WireEvent::AgentsUpdate(_) => EventKind::AgentsUpdate,
            WireEvent::AgentCreated(_) => EventKind::AgentCreated,
            WireEvent::AgentDeleted(_) => EventKind::AgentDeleted,
            WireEvent::AgentMoved(_) => EventKind::AgentMoved,
            WireEvent::AgentMoodChanged(_) => EventKind::AgentMoodChanged,
            WireEvent::AgentThought(_) => EventKind::AgentThought,
            WireEvent::AgentDialogue(_) => EventKind::AgentDialogue,
            WireEvent::EnvironmentUpdate(_) => EventKind::EnvironmentUpdate,
            WireEvent::WeatherChanged(_) => EventKind::WeatherChanged,
            WireEvent::TimeUpdated(_) => EventKind::TimeUpdated,
            WireEvent::EventCreated(_) => EventKind::EventCreated,
            WireEvent::RelationshipUpdate(_) => EventKind::RelationshipUpdate,
            WireEvent::MemoryCreated(_) => EventKind::MemoryCreated,
            WireEvent::PointsUpdate(_) => EventKind::PointsUpdate,
        }
    }
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, PayloadError> {
    envelope.data_as().map_err(|source| PayloadError {
        kind: envelope.kind,
        source,
    })
}
