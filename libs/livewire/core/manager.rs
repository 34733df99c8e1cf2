//! Connection manager
//!
//! Owns one transport's lifecycle for one channel: connect, send, receive,
//! close and reconnect with a fixed, attempt-capped backoff.
//!
//! All state lives behind one mutex and every transition happens in a short
//! critical section; handlers are always invoked with the lock released so
//! they may call back into the manager (`send`, `disconnect`, `connect`, `on`).
//!
//! Transport notifications carry the generation of the attempt that produced
//! them. Notifications from a superseded attempt are ignored, which keeps a
//! late `close` from an old socket from clobbering a newer connection.
//! Notifications that arrive while an attempt's transport is still being
//! installed are queued and replayed in order once it is in place.

use crate::config::ChannelConfig;
use crate::connection_state::{AtomicMetrics, ConnectionState, Metrics};
use crate::dispatcher::{EventDispatcher, Subscription};
use crate::traits::transport::TransportListener;
use crate::traits::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pending reconnect timer
struct ReconnectTimer {
    id: u64,
    handle: JoinHandle<()>,
}

/// Mutable state, only touched under `ManagerInner::state`
struct ManagerState {
    phase: ConnectionState,
    transport: Option<Box<dyn Transport>>,
    /// Generation of the current connection attempt
    generation: u64,
    reconnect_attempts: usize,
    intentionally_closed: bool,
    reconnect_timer: Option<ReconnectTimer>,
    next_timer_id: u64,
    /// Attempt whose transport is not installed yet
    installing: Option<u64>,
    /// Notifications held back for `installing`
    pending: VecDeque<TransportEvent>,
}

impl ManagerState {
    fn new() -> Self {
        Self {
            phase: ConnectionState::Idle,
            transport: None,
            generation: 0,
            reconnect_attempts: 0,
            intentionally_closed: false,
            reconnect_timer: None,
            next_timer_id: 0,
            installing: None,
            pending: VecDeque::new(),
        }
    }

    /// Cancel a pending reconnect timer, if any
    fn cancel_timer(&mut self) -> bool {
        match self.reconnect_timer.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }
}

struct ManagerInner<R: MessageRouter> {
    config: ChannelConfig,
    router: Arc<R>,
    connector: Arc<dyn Connector>,
    dispatcher: EventDispatcher<R::RouteKey, R::Message>,
    state: Mutex<ManagerState>,
    metrics: AtomicMetrics,
    self_ref: Weak<ManagerInner<R>>,
}

/// Connection manager for one channel
///
/// Cheap to clone; all clones share the same connection, state and handlers.
///
/// # Type Parameters
/// - `R`: MessageRouter implementation (decides message and route key types)
pub struct ConnectionManager<R: MessageRouter> {
    inner: Arc<ManagerInner<R>>,
}

impl<R: MessageRouter> Clone for ConnectionManager<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: MessageRouter> ConnectionManager<R> {
    /// Create a manager; it stays `Idle` until [`connect`](Self::connect)
    pub fn new(config: ChannelConfig, router: Arc<R>, connector: Arc<dyn Connector>) -> Self {
        let inner = Arc::new_cyclic(|self_ref| ManagerInner {
            config,
            router,
            connector,
            dispatcher: EventDispatcher::new(),
            state: Mutex::new(ManagerState::new()),
            metrics: AtomicMetrics::new(),
            self_ref: self_ref.clone(),
        });
        Self { inner }
    }

    /// Open the transport
    ///
    /// No-op (with a warning) while a transport is already connecting or
    /// open. Clears the intentional-close flag and cancels any pending
    /// reconnect timer, so this is also the manual way back from `Stopped`.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Close the transport and stop reconnecting
    ///
    /// Marks the close as intentional and cancels a pending reconnect timer
    /// before the transport is closed, so the resulting close notification
    /// is never mistaken for a transient drop.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Send a frame if the transport is open
    ///
    /// Fire-and-forget: while not open the frame is logged and discarded,
    /// never queued or retried.
    pub fn send(&self, message: WsMessage) {
        self.inner.send(message);
    }

    /// Register a handler for `key`; see [`EventDispatcher::on`]
    pub fn on<F>(&self, key: R::RouteKey, handler: F) -> Subscription
    where
        F: Fn(&R::Message) -> Result<()> + Send + Sync + 'static,
    {
        self.inner.dispatcher.on(key, handler)
    }

    /// The dispatcher embedded in this manager
    pub fn dispatcher(&self) -> &EventDispatcher<R::RouteKey, R::Message> {
        &self.inner.dispatcher
    }

    /// The router this manager parses frames with
    pub fn router(&self) -> &Arc<R> {
        &self.inner.router
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    pub fn url(&self) -> &str {
        self.inner.config.url()
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().phase
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Reconnects scheduled since the last successful open
    pub fn reconnect_attempts(&self) -> usize {
        self.inner.state.lock().reconnect_attempts
    }

    pub fn is_intentionally_closed(&self) -> bool {
        self.inner.state.lock().intentionally_closed
    }

    /// Whether a reconnect timer is pending
    pub fn has_pending_reconnect(&self) -> bool {
        self.inner.state.lock().reconnect_timer.is_some()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.inner.metrics.messages_sent(),
            messages_received: self.inner.metrics.messages_received(),
            reconnect_count: self.inner.metrics.reconnect_count(),
            connection_state: self.state(),
        }
    }

    /// Whether two handles refer to the same manager instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<R: MessageRouter> std::fmt::Debug for ConnectionManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url())
            .field("state", &self.state())
            .finish()
    }
}

impl<R: MessageRouter> ManagerInner<R> {
    fn connect(&self) {
        let generation = {
            let mut state = self.state.lock();
            if state.phase.is_active() {
                warn!(url = %self.config.url, state = %state.phase, "Already connected");
                return;
            }

            state.intentionally_closed = false;
            if state.cancel_timer() {
                debug!(url = %self.config.url, "Manual connect supersedes pending reconnect");
            }
            state.generation += 1;
            state.phase = ConnectionState::Connecting;
            state.installing = Some(state.generation);
            state.pending.clear();
            state.generation
        };

        debug!(url = %self.config.url, generation, "Connecting");

        let listener: Weak<dyn TransportListener> = self.self_ref.clone();
        let events = TransportEvents::new(listener, generation);
        // Opened outside the lock: connectors may report synchronously.
        let mut transport = self.connector.open(&self.config.url, events);

        let superseded = {
            let mut state = self.state.lock();
            if state.generation == generation && state.phase.is_active() {
                state.transport = Some(transport);
                None
            } else {
                Some(transport)
            }
        };
        if let Some(mut transport) = superseded {
            debug!(url = %self.config.url, generation, "Connection attempt superseded before install");
            transport.close();
        }

        self.replay_pending(generation);
    }

    /// Deliver notifications queued while `generation` was being installed
    fn replay_pending(&self, generation: u64) {
        loop {
            let event = {
                let mut state = self.state.lock();
                if state.installing != Some(generation) {
                    return;
                }
                match state.pending.pop_front() {
                    Some(event) => event,
                    None => {
                        state.installing = None;
                        return;
                    }
                }
            };
            self.handle_event(generation, event);
        }
    }

    fn handle_event(&self, generation: u64, event: TransportEvent) {
        match event {
            TransportEvent::Open => self.handle_open(generation),
            TransportEvent::Close(reason) => self.handle_close(generation, &reason),
            TransportEvent::Message(message) => {
                if self.is_current(generation) {
                    self.handle_message(message);
                }
            }
            TransportEvent::Error(reason) => {
                if self.is_current(generation) {
                    self.handle_error(&reason);
                }
            }
        }
    }

    fn disconnect(&self) {
        let transport = {
            let mut state = self.state.lock();
            state.intentionally_closed = true;
            if state.cancel_timer() {
                debug!(url = %self.config.url, "Cancelled pending reconnect");
            }
            state.phase = ConnectionState::Stopped;
            state.transport.take()
        };

        if let Some(mut transport) = transport {
            info!(url = %self.config.url, "Disconnecting");
            transport.close();
        }
    }

    fn send(&self, message: WsMessage) {
        let mut state = self.state.lock();
        if !state.phase.is_open() {
            error!(url = %self.config.url, state = %state.phase, "Cannot send message - not connected");
            return;
        }

        match state.transport.as_mut() {
            Some(transport) => match transport.send(message) {
                Ok(()) => self.metrics.increment_sent(),
                Err(e) => warn!(url = %self.config.url, "Failed to send message: {}", e),
            },
            None => {
                error!(url = %self.config.url, "Cannot send message - no transport");
            }
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let current = self.state.lock().generation;
        if generation != current {
            debug!(
                url = %self.config.url,
                generation,
                current,
                "Ignoring event from superseded transport"
            );
            return false;
        }
        true
    }

    fn handle_open(&self, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                debug!(url = %self.config.url, generation, "Ignoring open from superseded transport");
                return;
            }
            if !state.phase.is_active() {
                debug!(url = %self.config.url, state = %state.phase, "Ignoring open after close");
                return;
            }
            state.phase = ConnectionState::Open;
            state.reconnect_attempts = 0;
        }
        info!(url = %self.config.url, "Connected");
        self.dispatch_lifecycle(Lifecycle::Open);
    }

    fn handle_message(&self, message: WsMessage) {
        self.metrics.increment_received();
        match self.router.parse(&message) {
            Ok(parsed) => {
                let key = self.router.route_key(&parsed);
                self.dispatcher.dispatch(&key, &parsed);
            }
            Err(e) => {
                warn!(url = %self.config.url, "Failed to parse message: {}", e);
            }
        }
    }

    fn handle_error(&self, reason: &str) {
        error!(url = %self.config.url, "Transport error: {}", reason);
        self.dispatch_lifecycle(Lifecycle::Error);
    }

    fn handle_close(&self, generation: u64, reason: &str) {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                debug!(url = %self.config.url, generation, "Ignoring close from superseded transport");
                return;
            }
            state.transport = None;

            if state.intentionally_closed {
                state.phase = ConnectionState::Stopped;
            } else {
                self.schedule_reconnect(&mut state);
            }
        }

        if reason.is_empty() {
            info!(url = %self.config.url, "Disconnected");
        } else {
            info!(url = %self.config.url, reason, "Disconnected");
        }
        self.dispatch_lifecycle(Lifecycle::Close);
    }

    /// Decide, under the state lock, whether another attempt is allowed
    fn schedule_reconnect(&self, state: &mut ManagerState) {
        let max = self.config.max_reconnect_attempts();
        let delay = match self.config.reconnect.next_delay(state.reconnect_attempts) {
            Some(delay) => delay,
            None => {
                error!(url = %self.config.url, attempts = state.reconnect_attempts, "Max reconnect attempts reached");
                state.phase = ConnectionState::Stopped;
                return;
            }
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(url = %self.config.url, "Cannot schedule reconnect without a runtime: {}", e);
                state.phase = ConnectionState::Stopped;
                return;
            }
        };

        state.reconnect_attempts += 1;
        state.phase = ConnectionState::Reconnecting;
        self.metrics.increment_reconnects();
        info!(
            url = %self.config.url,
            attempt = state.reconnect_attempts,
            max,
            "Reconnecting in {:?}",
            delay
        );

        state.next_timer_id += 1;
        let timer_id = state.next_timer_id;
        let weak = self.self_ref.clone();
        let handle = runtime.spawn(reconnect_after(weak, delay, timer_id));
        state.reconnect_timer = Some(ReconnectTimer {
            id: timer_id,
            handle,
        });
    }

    fn fire_reconnect(&self, timer_id: u64) {
        {
            let mut state = self.state.lock();
            match &state.reconnect_timer {
                Some(timer) if timer.id == timer_id => {
                    state.reconnect_timer = None;
                }
                _ => {
                    debug!(url = %self.config.url, timer_id, "Stale reconnect timer ignored");
                    return;
                }
            }
            if state.intentionally_closed {
                return;
            }
        }
        self.connect();
    }

    fn dispatch_lifecycle(&self, event: Lifecycle) {
        let message = self.router.lifecycle(event);
        let key = self.router.route_key(&message);
        self.dispatcher.dispatch(&key, &message);
    }
}

impl<R: MessageRouter> TransportListener for ManagerInner<R> {
    fn on_transport_event(&self, generation: u64, event: TransportEvent) {
        {
            let mut state = self.state.lock();
            if state.installing == Some(generation) {
                state.pending.push_back(event);
                return;
            }
        }
        self.handle_event(generation, event);
    }
}

async fn reconnect_after<R: MessageRouter>(weak: Weak<ManagerInner<R>>, delay: Duration, timer_id: u64) {
    tokio::time::sleep(delay).await;
    if let Some(inner) = weak.upgrade() {
        inner.fire_reconnect(timer_id);
    }
}
