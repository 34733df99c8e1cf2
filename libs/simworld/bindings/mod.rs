//! Subscription bindings
//!
//! Scoped registrations against shared channels. Every binding owns its
//! subscriptions and releases them when dropped; none of them ever
//! disconnects a channel.

pub mod agents;
pub mod channel;
pub mod event;
pub mod feed;

pub use agents::{AgentCallbacks, AgentFeed};
pub use channel::{ChannelBinding, WorldChannelExt};
pub use event::EventBinding;
pub use feed::SemanticFeed;
