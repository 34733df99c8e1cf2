//! # LiveWire
//!
//! A realtime channel client that keeps one persistent connection per logical
//! endpoint, recovers from transient drops and fans typed events out to any
//! number of independent subscribers.
//!
//! ## Features
//!
//! - **Explicit state machine**: `Idle → Connecting → Open → Reconnecting | Stopped`
//! - **Fixed-interval backoff**: attempt-capped, reset on every successful open
//! - **Fault-isolated dispatch**: a failing handler never affects its siblings
//! - **Pluggable transport**: the manager only talks to the `Connector`/`Transport`
//!   traits; a tokio-tungstenite implementation ships in `core::tungstenite`
//! - **Channel registry**: at most one manager per channel per registry

pub mod traits;
pub mod core;
pub mod registry;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use self::core::{
    config, connection_state, dispatcher, manager, tungstenite,
    config::{ChannelConfig, ReconnectPolicy},
    connection_state::{AtomicMetrics, ConnectionState, Metrics},
    dispatcher::{EventDispatcher, Subscription},
    manager::ConnectionManager,
    tungstenite::TungsteniteConnector,
};

// Re-export registry
pub use registry::{channel_url, ChannelId, ChannelRegistry};

/// Type alias for Result with LiveWireError
pub type Result<T> = std::result::Result<T, traits::LiveWireError>;
