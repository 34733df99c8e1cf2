//! # LiveWire Core
//!
//! The connection manager and its collaborators.
//!
//! ## Example
//!
//! ```rust,ignore
//! use livewire::{ChannelConfig, ConnectionManager, TungsteniteConnector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = ConnectionManager::new(
//!         ChannelConfig::new("ws://localhost:8000/ws/agents"),
//!         Arc::new(MyRouter),
//!         Arc::new(TungsteniteConnector::new()),
//!     );
//!
//!     let _sub = manager.on(MyKind::AgentCreated, |message| {
//!         println!("created: {:?}", message);
//!         Ok(())
//!     });
//!
//!     manager.connect();
//! }
//! ```

pub mod config;
pub mod connection_state;
pub mod dispatcher;
pub mod manager;
pub mod tungstenite;

// Re-export main types
pub use config::{ChannelConfig, ReconnectPolicy};
pub use connection_state::{AtomicMetrics, ConnectionState, Metrics};
pub use dispatcher::{EventDispatcher, Subscription};
pub use manager::ConnectionManager;
pub use tungstenite::TungsteniteConnector;

// Re-export traits for convenience
pub use crate::traits::*;
