//! Keyed state notifier
//!
//! Holds the last value published under each key together with the
//! subscribers for that key. Publishing shallow-merges a patch into the stored
//! value and hands the merged value to every subscriber in registration order.
//!
//! Callbacks run after the internal lock is released, so a subscriber may
//! publish or (un)subscribe from inside its callback.

use soul_core::Merge;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::error;

/// Key under which the controller publishes player state
pub const PLAYER_STATE: &str = "playerstatechange";

/// Subscriber callback
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct BusInner<T> {
    values: HashMap<String, T>,
    subscribers: HashMap<String, Vec<(u64, Callback<T>)>>,
    next_id: u64,
}

impl<T> BusInner<T> {
    fn remove(&mut self, key: &str, id: u64) {
        if let Some(list) = self.subscribers.get_mut(key) {
            list.retain(|(sub, _)| *sub != id);
            if list.is_empty() {
                self.subscribers.remove(key);
            }
        }
    }
}

/// Keyed publish/subscribe store
///
/// Cloning yields another handle to the same store.
pub struct StateBus<T: Merge> {
    inner: Arc<Mutex<BusInner<T>>>,
}

impl<T: Merge> Clone for StateBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Merge> Default for StateBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Merge> StateBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                values: HashMap::new(),
                subscribers: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BusInner<T>> {
        // Callbacks never run under the lock, so poisoning only means a panic
        // inside merge; the map itself is still consistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Merge `patch` into the value for `key` and notify subscribers
    ///
    /// `None` is a no-op: nothing is stored and no subscriber runs.
    pub fn publish(&self, key: &str, patch: Option<&T::Patch>) {
        let Some(patch) = patch else {
            return;
        };

        let (value, callbacks) = {
            let mut inner = self.lock();
            let merged = inner.values.get(key).cloned().unwrap_or_default().merge(patch);
            inner.values.insert(key.to_string(), merged.clone());
            let callbacks: Vec<Callback<T>> = inner
                .subscribers
                .get(key)
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default();
            (merged, callbacks)
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(&value))).is_err() {
                error!("Subscriber for '{}' panicked; continuing with the rest", key);
            }
        }
    }

    /// Last merged value for `key`
    ///
    /// Keys that were subscribed to but never published hold the default value.
    pub fn latest(&self, key: &str) -> Option<T> {
        self.lock().values.get(key).cloned()
    }

    /// Drop every subscriber and stored value
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.values.clear();
        inner.subscribers.clear();
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.lock().subscribers.get(key).map_or(0, Vec::len)
    }
}

impl<T: Merge + Send + 'static> StateBus<T> {
    /// Register `callback` for `key`
    ///
    /// The subscription stays active until [`Subscription::unsubscribe`] is
    /// called; dropping the handle does not unsubscribe.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.values.entry(key.to_string()).or_default();
            inner
                .subscribers
                .entry(key.to_string())
                .or_default()
                .push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<BusInner<T>>> = Arc::downgrade(&self.inner);
        let key = key.to_string();
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().unwrap_or_else(|e| e.into_inner()).remove(&key, id);
                }
            })),
        }
    }
}

/// Handle returned by [`StateBus::subscribe`]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Stop receiving values; calling on an already removed subscriber is harmless
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
