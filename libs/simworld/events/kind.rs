use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event types understood by the world-simulation channels
///
/// The three `Connection*` kinds are synthesized by the connection manager
/// and never arrive over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ConnectionOpen,
    ConnectionClose,
    ConnectionError,
    AgentsUpdate,
    AgentCreated,
    AgentDeleted,
    AgentMoved,
    AgentMoodChanged,
    AgentThought,
    AgentDialogue,
    EnvironmentUpdate,
    WeatherChanged,
    TimeUpdated,
    EventCreated,
    RelationshipUpdate,
    MemoryCreated,
    PointsUpdate,
}

impl EventKind {
    pub const ALL: [EventKind; 17] = [
        EventKind::ConnectionOpen,
        EventKind::ConnectionClose,
        EventKind::ConnectionError,
        EventKind::AgentsUpdate,
        EventKind::AgentCreated,
        EventKind::AgentDeleted,
        EventKind::AgentMoved,
        EventKind::AgentMoodChanged,
        EventKind::AgentThought,
        EventKind::AgentDialogue,
        EventKind::EnvironmentUpdate,
        EventKind::WeatherChanged,
        EventKind::TimeUpdated,
        EventKind::EventCreated,
        EventKind::RelationshipUpdate,
        EventKind::MemoryCreated,
        EventKind::PointsUpdate,
    ];

    /// Kinds carried by the agents channel
    pub const AGENT_KINDS: [EventKind; 7] = [
        EventKind::AgentsUpdate,
        EventKind::AgentCreated,
        EventKind::AgentDeleted,
        EventKind::AgentMoved,
        EventKind::AgentMoodChanged,
        EventKind::AgentThought,
        EventKind::AgentDialogue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ConnectionOpen => "connection_open",
            EventKind::ConnectionClose => "connection_close",
            EventKind::ConnectionError => "connection_error",
            EventKind::AgentsUpdate => "agents_update",
            EventKind::AgentCreated => "agent_created",
            EventKind::AgentDeleted => "agent_deleted",
            EventKind::AgentMoved => "agent_moved",
            EventKind::AgentMoodChanged => "agent_mood_changed",
            EventKind::AgentThought => "agent_thought",
            EventKind::AgentDialogue => "agent_dialogue",
            EventKind::EnvironmentUpdate => "environment_update",
            EventKind::WeatherChanged => "weather_changed",
            EventKind::TimeUpdated => "time_updated",
            EventKind::EventCreated => "event_created",
            EventKind::RelationshipUpdate => "relationship_update",
            EventKind::MemoryCreated => "memory_created",
            EventKind::PointsUpdate => "points_update",
        }
    }

    /// Client-synthesized connection lifecycle kind
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            EventKind::ConnectionOpen | EventKind::ConnectionClose | EventKind::ConnectionError
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised event type string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type '{}'", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}
