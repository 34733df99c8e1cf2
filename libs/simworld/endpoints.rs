use std::fmt;

/// Realtime endpoints exposed by the simulation server
///
/// Each endpoint is its own channel with its own connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Agent lifecycle, movement, mood, thoughts and dialogue
    Agents,
    /// Spatial point batches
    Points,
    /// Weather and time
    Environment,
    /// World events
    Events,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Agents,
        Endpoint::Points,
        Endpoint::Environment,
        Endpoint::Events,
    ];

    /// Path appended to the realtime base address
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Agents => "/ws/agents",
            Endpoint::Points => "/ws/points",
            Endpoint::Environment => "/ws/environment",
            Endpoint::Events => "/ws/events",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Agents => "agents",
            Endpoint::Points => "points",
            Endpoint::Environment => "environment",
            Endpoint::Events => "events",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
