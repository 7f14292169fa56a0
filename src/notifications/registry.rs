//! Subscriber Registry
//!
//! Thread-safe set of active subscribers. The lock is held only for a single
//! mutation or for copying the membership out; delivery always works on a
//! snapshot so callbacks never run under the lock.

use std::collections::HashSet;

use log::trace;
use parking_lot::Mutex;

use crate::notifications::subscriber::SubscriberHandle;

/// Set of currently registered subscribers
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashSet<SubscriberHandle>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subscriber; returns `false` if it was already registered
    pub fn add(&self, subscriber: SubscriberHandle) -> bool {
        let label = subscriber.to_string();
        let inserted = self.subscribers.lock().insert(subscriber);
        trace!("Registry add {}: {}", label, if inserted { "inserted" } else { "already present" });
        inserted
    }

    /// Remove a subscriber; returns `false` if it was not registered
    pub fn remove(&self, subscriber: &SubscriberHandle) -> bool {
        let removed = self.subscribers.lock().remove(subscriber);
        let outcome = if removed { "removed" } else { "not present" };
        trace!("Registry remove {}: {}", subscriber, outcome);
        removed
    }

    /// Copy of the membership at the instant of the call
    pub fn snapshot(&self) -> Vec<SubscriberHandle> {
        self.subscribers.lock().iter().cloned().collect()
    }

    pub fn contains(&self, subscriber: &SubscriberHandle) -> bool {
        self.subscribers.lock().contains(subscriber)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Remove every subscriber, returning how many were registered
    pub fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        let count = subscribers.len();
        subscribers.clear();
        count
    }
}
