//! Subscriber lists for change notifications and provider messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Handle returned by a subscription, used to cancel it.
pub type SubscriptionId = u64;

/// Listener for events of type `E`.
pub type EventCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Listeners for one event type, called in subscription order.
pub struct CallbackRegistry<E> {
    listeners: RwLock<Vec<(SubscriptionId, EventCallback<E>)>>,
    next_id: AtomicU64,
}

impl<E> CallbackRegistry<E> {
    /// Create a registry with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a listener.
    pub fn subscribe(&self, callback: EventCallback<E>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().unwrap().push((id, callback));
        id
    }

    /// Remove a listener. Returns `false` for an unknown id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write().unwrap();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener.
    ///
    /// Listeners run on a copy of the list, so they may subscribe or
    /// unsubscribe while being called. A panicking listener is skipped.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<EventCallback<E>> = self
            .listeners
            .read()
            .unwrap()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for listener in listeners {
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(event))).is_err()
            {
                log::warn!("Event listener panicked");
            }
        }
    }
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for CallbackRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("listeners", &self.listeners.read().unwrap().len())
            .finish()
    }
}
