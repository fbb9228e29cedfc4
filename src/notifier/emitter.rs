//! In-process event emitter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::trace;

use super::types::VaultEvent;

type Callback = Arc<dyn Fn(&VaultEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, Callback>>,
}

/// Callback registry for observers living in the same process.
///
/// Cloning is cheap and every clone shares the same registry, so the
/// broadcast listener task can hand remote events to the same subscribers.
#[derive(Clone, Default)]
pub struct LocalEmitter {
    registry: Arc<Registry>,
}

impl LocalEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` and returns the handle that detaches it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&VaultEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut callbacks) = self.registry.callbacks.lock() {
            callbacks.insert(id, Arc::new(callback));
        }
        trace!("Subscriber {} attached", id);
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Calls every subscriber with `event`, synchronously.
    ///
    /// Callbacks run outside the registry lock so they may subscribe or
    /// unsubscribe while being notified.
    pub fn emit(&self, event: &VaultEvent) {
        let callbacks: Vec<Callback> = match self.registry.callbacks.lock() {
            Ok(callbacks) => callbacks.values().cloned().collect(),
            Err(_) => return,
        };
        trace!("Emitting {:?} to {} subscriber(s)", event, callbacks.len());
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry
            .callbacks
            .lock()
            .map(|callbacks| callbacks.len())
            .unwrap_or(0)
    }
}

/// Detachment handle returned by `subscribe`.
///
/// Dropping it detaches the callback, as does `unsubscribe`.
#[must_use = "dropping a Subscription immediately detaches its callback"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut callbacks) = registry.callbacks.lock() {
                callbacks.remove(&self.id);
            }
        }
        trace!("Subscriber {} detached", self.id);
    }
}
