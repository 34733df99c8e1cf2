//! # SimWorld
//!
//! Realtime client layer for the world-simulation backend: the four channel
//! endpoints, the `{type, data}` event vocabulary, typed payloads, semantic
//! events for rendering and scoped subscription bindings, all on top of
//! `livewire`.
//!
//! ## Example
//!
//! ```no_run
//! use simworld::bindings::{AgentCallbacks, AgentFeed};
//! use simworld::{new_registry, RealtimeConfig};
//!
//! # async fn run() {
//! let registry = new_registry(&RealtimeConfig::default());
//! let _feed = AgentFeed::new(
//!     &registry,
//!     AgentCallbacks::new().on_agent_created(|agent| println!("{} joined", agent.name)),
//!     true,
//! );
//! # }
//! ```

pub mod bindings;
pub mod config;
pub mod endpoints;
pub mod events;
pub mod logging;
pub mod semantic;

pub use bindings::{AgentCallbacks, AgentFeed, ChannelBinding, EventBinding, SemanticFeed, WorldChannelExt};
pub use config::{ConfigError, RealtimeConfig};
pub use endpoints::Endpoint;
pub use events::{Envelope, EventKind, OutgoingMessage, WireEvent, WorldRouter};
pub use semantic::{expand, BubbleTiming, DialogueLog, SemanticEvent, Weather};

use livewire::{ChannelRegistry, Connector, ConnectionManager, TungsteniteConnector};
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// Connection manager for one world channel
pub type WorldChannel = ConnectionManager<WorldRouter>;

/// Registry of world channels
pub type WorldRegistry = ChannelRegistry<WorldRouter>;

/// Registry over real WebSocket connections
pub fn new_registry(config: &RealtimeConfig) -> WorldRegistry {
    registry_with_connector(config, Arc::new(TungsteniteConnector::new()))
}

/// Registry over an arbitrary connector
pub fn registry_with_connector(config: &RealtimeConfig, connector: Arc<dyn Connector>) -> WorldRegistry {
    ChannelRegistry::with_defaults(
        config.ws_url.clone(),
        config.reconnect_policy(),
        Arc::new(WorldRouter::new()),
        connector,
    )
}

/// Process-wide registry, configured from the environment on first use
///
/// An invalid environment is logged and the defaults are used instead.
pub fn global_registry() -> &'static WorldRegistry {
    static REGISTRY: OnceLock<WorldRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let config = RealtimeConfig::from_env().unwrap_or_else(|e| {
            warn!("Invalid realtime configuration, using defaults: {}", e);
            RealtimeConfig::default()
        });
        new_registry(&config)
    })
}
