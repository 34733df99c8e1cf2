//! Event dispatcher
//!
//! Per-manager registry of route key → handler set. Every handler invocation
//! is isolated: a handler returning `Err` or panicking is logged and the
//! remaining handlers still run. `dispatch` itself never fails.

use crate::Result;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{error, trace};

/// Shared handler callback
pub type Handler<M> = Arc<dyn Fn(&M) -> Result<()> + Send + Sync>;

type HandlerId = u64;

struct DispatcherInner<K, M> {
    handlers: RwLock<HashMap<K, HashMap<HandlerId, Handler<M>>>>,
    next_id: AtomicU64,
}

impl<K, M> DispatcherInner<K, M>
where
    K: Hash + Eq,
{
    fn remove(&self, key: &K, id: HandlerId) {
        let mut handlers = self.handlers.write();
        if let Some(set) = handlers.get_mut(key) {
            set.remove(&id);
        }
    }
}

/// Routes messages to the handlers registered for their key
pub struct EventDispatcher<K, M> {
    inner: Arc<DispatcherInner<K, M>>,
}

impl<K, M> Clone for EventDispatcher<K, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, M> Default for EventDispatcher<K, M>
where
    K: Hash + Eq + Clone + Send + Sync + Debug + 'static,
    M: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, M> EventDispatcher<K, M>
where
    K: Hash + Eq + Clone + Send + Sync + Debug + 'static,
    M: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                handlers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `handler` for `key`
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn on<F>(&self, key: K, handler: F) -> Subscription
    where
        F: Fn(&M) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .handlers
            .write()
            .entry(key.clone())
            .or_default()
            .insert(id, Arc::new(handler));
        trace!(route = ?key, handler_id = id, "Handler registered");

        let weak: Weak<DispatcherInner<K, M>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.remove(&key, id);
                trace!(route = ?key, handler_id = id, "Handler removed");
            }
        })
    }

    /// Invoke every handler registered for `key` with `message`
    ///
    /// Returns the number of handlers invoked (including ones that failed).
    pub fn dispatch(&self, key: &K, message: &M) -> usize {
        // Snapshot so handlers may (un)register without deadlocking.
        let handlers: Vec<Handler<M>> = match self.inner.handlers.read().get(key) {
            Some(set) => set.values().cloned().collect(),
            None => return 0,
        };

        for handler in &handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(route = ?key, "Error in handler: {}", e);
                }
                Err(payload) => {
                    error!(route = ?key, "Handler panicked: {}", panic_message(payload.as_ref()));
                }
            }
        }

        handlers.len()
    }

    /// Number of handlers currently registered for `key`
    pub fn handler_count(&self, key: &K) -> usize {
        self.inner
            .handlers
            .read()
            .get(key)
            .map_or(0, |set| set.len())
    }

    /// Number of handlers across all keys
    pub fn total_handlers(&self) -> usize {
        self.inner.handlers.read().values().map(|set| set.len()).sum()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Disposer for one handler registration
///
/// Unsubscribing is idempotent. Dropping the subscription unsubscribes too,
/// so a consumer's registration lives exactly as long as the consumer keeps
/// this value. Use [`Subscription::detach`] to keep a handler registered for
/// the dispatcher's whole lifetime.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    remover: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(remover: impl FnOnce() + Send + 'static) -> Self {
        Self {
            remover: Mutex::new(Some(Box::new(remover))),
        }
    }

    /// Remove the handler; calling this again is a no-op
    pub fn unsubscribe(&self) {
        let remover = self.remover.lock().take();
        if let Some(remover) = remover {
            remover();
        }
    }

    /// Whether the handler is still registered through this subscription
    pub fn is_active(&self) -> bool {
        self.remover.lock().is_some()
    }

    /// Give up the ability to unsubscribe; the handler stays registered
    pub fn detach(self) {
        self.remover.lock().take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
