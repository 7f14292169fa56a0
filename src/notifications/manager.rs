//! Notification Manager
//!
//! Boundary facade used by views: owns one subscriber registry and one
//! dispatcher. Construct it once per application context and share clones;
//! every clone refers to the same registry and worker.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::notifications::dispatcher::{Dispatcher, DispatcherConfig};
use crate::notifications::error::NotificationResult;
use crate::notifications::registry::SubscriberRegistry;
use crate::notifications::stats::DeliveryStats;
use crate::notifications::subscriber::SubscriberHandle;

struct Inner {
    registry: Arc<SubscriberRegistry>,
    dispatcher: Dispatcher,
}

/// Shared handle to the broadcast machinery
#[derive(Clone)]
pub struct NotificationManager {
    inner: Arc<Inner>,
}

impl NotificationManager {
    /// Create a manager with the default dispatcher configuration
    pub fn new() -> NotificationResult<Self> {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a manager with a custom dispatcher configuration
    pub fn with_config(config: DispatcherConfig) -> NotificationResult<Self> {
        let registry = Arc::new(SubscriberRegistry::new());
        let dispatcher = Dispatcher::start(Arc::clone(&registry), config)?;
        Ok(Self {
            inner: Arc::new(Inner { registry, dispatcher }),
        })
    }

    /// Register a subscriber; returns `false` if it was already registered
    pub fn subscribe(&self, subscriber: SubscriberHandle) -> bool {
        let label = subscriber.to_string();
        let added = self.inner.registry.add(subscriber);
        if added {
            debug!("Subscribed {} to notifications", label);
        }
        added
    }

    /// Remove a subscriber; returns `false` if it was not registered
    pub fn unsubscribe(&self, subscriber: &SubscriberHandle) -> bool {
        let removed = self.inner.registry.remove(subscriber);
        if removed {
            debug!("Unsubscribed {} from notifications", subscriber);
        }
        removed
    }

    /// Broadcast `message` to all current subscribers without waiting.
    ///
    /// Returns how many deliveries were scheduled.
    pub fn notify_all(&self, message: &str) -> usize {
        self.inner.dispatcher.notify_all(message)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn has_subscriber(&self, subscriber: &SubscriberHandle) -> bool {
        self.inner.registry.contains(subscriber)
    }

    /// Copy of the current subscriber set
    pub fn subscribers(&self) -> Vec<SubscriberHandle> {
        self.inner.registry.snapshot()
    }

    /// Block until all previously scheduled deliveries have run
    pub fn flush(&self) {
        self.inner.dispatcher.flush();
    }

    /// Bounded variant of [`flush`](Self::flush); `false` on timeout
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        self.inner.dispatcher.flush_timeout(timeout)
    }

    pub fn stats(&self) -> DeliveryStats {
        self.inner.dispatcher.stats()
    }

    pub fn is_running(&self) -> bool {
        self.inner.dispatcher.is_running()
    }

    /// Drain pending deliveries, stop the worker and drop all subscribers
    pub fn shutdown(&self) -> NotificationResult<()> {
        debug!("Shutting down notification manager");
        self.inner.dispatcher.shutdown()?;
        let removed = self.inner.registry.clear();
        info!("Notification manager shut down ({} subscribers removed)", removed);
        Ok(())
    }
}
