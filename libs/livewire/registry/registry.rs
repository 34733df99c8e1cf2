use crate::config::{ChannelConfig, ReconnectPolicy};
use crate::connection_state::ConnectionState;
use crate::manager::ConnectionManager;
use crate::traits::{Connector, MessageRouter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Unique identifier for a channel: the full endpoint URL
pub type ChannelId = String;

/// Build a channel identifier from a base address and an endpoint path
///
/// A trailing `/` on the base is dropped when the path starts with one, so
/// `ws://host/` + `/ws/agents` and `ws://host` + `/ws/agents` name the same
/// channel.
pub fn channel_url(base: &str, path: &str) -> ChannelId {
    if path.starts_with('/') {
        format!("{}{}", base.strip_suffix('/').unwrap_or(base), path)
    } else {
        format!("{}{}", base, path)
    }
}

/// Registry of connection managers, one per channel
///
/// Holds at most one [`ConnectionManager`] per channel identifier, so every
/// consumer of a channel shares one physical connection. Creating an entry
/// never opens a transport; only [`connect`](Self::connect) (or the
/// manager's own `connect`) does.
///
/// # Type Parameters
/// - `R`: MessageRouter implementation shared by every managed channel
pub struct ChannelRegistry<R: MessageRouter> {
    base_url: String,
    defaults: ReconnectPolicy,
    router: Arc<R>,
    connector: Arc<dyn Connector>,
    channels: RwLock<HashMap<ChannelId, ConnectionManager<R>>>,
}

impl<R: MessageRouter> ChannelRegistry<R> {
    /// Create a registry with the default reconnect policy
    ///
    /// # Example
    /// ```ignore
    /// let registry = ChannelRegistry::new(
    ///     "ws://localhost:8000",
    ///     Arc::new(MyRouter),
    ///     Arc::new(TungsteniteConnector::new()),
    /// );
    ///
    /// let agents = registry.connect("/ws/agents");
    /// let _sub = agents.on(MyKind::AgentMoved, |message| Ok(()));
    /// ```
    pub fn new(base_url: impl Into<String>, router: Arc<R>, connector: Arc<dyn Connector>) -> Self {
        Self::with_defaults(base_url, ReconnectPolicy::default(), router, connector)
    }

    /// Create a registry whose managers use `defaults` for reconnection
    pub fn with_defaults(
        base_url: impl Into<String>,
        defaults: ReconnectPolicy,
        router: Arc<R>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            defaults,
            router,
            connector,
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn defaults(&self) -> ReconnectPolicy {
        self.defaults
    }

    /// Get the manager for `path`, creating it if needed
    ///
    /// Repeated calls with the same path return the same instance.
    pub fn get(&self, path: &str) -> ConnectionManager<R> {
        let id = channel_url(&self.base_url, path);

        if let Some(manager) = self.channels.read().get(&id) {
            return manager.clone();
        }

        let mut channels = self.channels.write();
        channels
            .entry(id)
            .or_insert_with_key(|id| {
                debug!(channel = %id, "Creating channel manager");
                let config = ChannelConfig::new(id.clone()).with_reconnect(self.defaults);
                ConnectionManager::new(config, Arc::clone(&self.router), Arc::clone(&self.connector))
            })
            .clone()
    }

    /// Get-or-create the manager for `path` and connect it
    pub fn connect(&self, path: &str) -> ConnectionManager<R> {
        let manager = self.get(path);
        manager.connect();
        manager
    }

    /// Disconnect and evict the manager for `path`; no-op if absent
    pub fn disconnect(&self, path: &str) {
        let id = channel_url(&self.base_url, path);
        let manager = self.channels.write().remove(&id);

        if let Some(manager) = manager {
            manager.disconnect();
            info!(channel = %id, "Removed channel");
        }
    }

    /// Disconnect and evict every manager
    pub fn disconnect_all(&self) {
        let channels = std::mem::take(&mut *self.channels.write());
        if channels.is_empty() {
            return;
        }

        info!(count = channels.len(), "Disconnecting all channels");
        for (id, manager) in channels {
            debug!(channel = %id, "Disconnecting channel");
            manager.disconnect();
        }
    }

    /// Get all channel identifiers
    pub fn list_channels(&self) -> Vec<ChannelId> {
        self.channels.read().keys().cloned().collect()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Check if a manager exists for `path`
    pub fn has_channel(&self, path: &str) -> bool {
        self.channels
            .read()
            .contains_key(&channel_url(&self.base_url, path))
    }

    /// Get connection state for all channels
    pub fn statuses(&self) -> HashMap<ChannelId, ConnectionState> {
        self.channels
            .read()
            .iter()
            .map(|(id, manager)| (id.clone(), manager.state()))
            .collect()
    }
}

impl<R: MessageRouter> std::fmt::Debug for ChannelRegistry<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("base_url", &self.base_url)
            .field("channels", &self.channel_count())
            .finish()
    }
}
