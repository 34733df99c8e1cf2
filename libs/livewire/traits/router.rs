//! Message Routing
//!
//! The router is the only place where the channel client learns anything
//! about the application protocol. It turns raw frames into typed messages,
//! names the key each message is dispatched on, and builds the synthetic
//! lifecycle messages the manager emits itself.
//!
//! # Architecture
//!
//! ```text
//! Transport → Frame → Router::parse → Router::route_key → Dispatcher → Handlers
//!                          ↓ (Err)
//!                     log + drop
//! ```
//!
//! # Ordering Guarantees
//!
//! - Frames are parsed and dispatched on the transport's delivery path, one at
//!   a time, so dispatch order equals arrival order.
//! - Handlers registered for the same key have no ordering among themselves.

use crate::{Result, WsMessage};
use std::fmt::Debug;
use std::hash::Hash;

/// Lifecycle notifications synthesized by the connection manager.
///
/// These never travel over the wire; the router decides what message each
/// one becomes so handlers can subscribe to them like any other event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// The transport finished opening
    Open,
    /// The transport closed, for whatever reason
    Close,
    /// The transport reported an error; a close follows
    Error,
}

/// Message router that parses frames and determines routing
///
/// # Type Parameters
/// - `Message`: The parsed message type handed to handlers
/// - `RouteKey`: The key handlers register on
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// enum Kind { Open, Close, Error, Tick }
///
/// struct TickRouter;
///
/// impl MessageRouter for TickRouter {
///     type Message = (Kind, String);
///     type RouteKey = Kind;
///
///     fn parse(&self, message: &WsMessage) -> Result<Self::Message> {
///         let text = message.as_text().ok_or_else(|| LiveWireError::Parse("binary".into()))?;
///         Ok((Kind::Tick, text.to_string()))
///     }
///
///     fn route_key(&self, message: &Self::Message) -> Self::RouteKey {
///         message.0.clone()
///     }
///
///     fn lifecycle(&self, event: Lifecycle) -> Self::Message {
///         match event {
///             Lifecycle::Open => (Kind::Open, String::new()),
///             Lifecycle::Close => (Kind::Close, String::new()),
///             Lifecycle::Error => (Kind::Error, String::new()),
///         }
///     }
/// }
/// ```
pub trait MessageRouter: Send + Sync + 'static {
    /// The parsed message type
    type Message: Send + Sync + Debug + 'static;

    /// The route key type (determines which handlers receive the message)
    type RouteKey: Hash + Eq + Clone + Send + Sync + Debug + 'static;

    /// Parse a raw frame into a typed message
    ///
    /// Returning `Err` drops the frame: nothing is dispatched and the
    /// connection stays as it is.
    fn parse(&self, message: &WsMessage) -> Result<Self::Message>;

    /// Extract the route key from a parsed message
    ///
    /// This is on the hot path - should be a simple match/field access!
    fn route_key(&self, message: &Self::Message) -> Self::RouteKey;

    /// Build the message dispatched for a lifecycle notification
    fn lifecycle(&self, event: Lifecycle) -> Self::Message;
}
