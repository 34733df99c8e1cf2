//! # LiveWire Traits
//!
//! Core traits and types shared by every part of the channel client:
//!
//! - **MessageRouter**: Parse inbound frames and pick the route key they dispatch on
//! - **Connector / Transport**: Open, write to and close one physical connection
//! - **TransportEvents**: The inbound notification sink handed to a connector

pub mod error;
pub mod message;
pub mod router;
pub mod transport;

// Re-export commonly used types
pub use error::{LiveWireError, Result};
pub use message::WsMessage;
pub use router::{Lifecycle, MessageRouter};
pub use transport::{Connector, Transport, TransportEvent, TransportEvents};
