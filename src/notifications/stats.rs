//! Delivery Statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Calls to `notify_all` accepted by a running dispatcher
    pub broadcasts: u64,

    /// Delivery jobs placed on the worker queue
    pub deliveries_scheduled: u64,

    /// Callbacks that returned `Ok`
    pub deliveries_succeeded: u64,

    /// Callbacks that returned an error or panicked
    pub delivery_failures: u64,
}

impl DeliveryStats {
    /// Jobs scheduled but not yet finished
    pub fn pending(&self) -> u64 {
        self.deliveries_scheduled
            .saturating_sub(self.deliveries_succeeded + self.delivery_failures)
    }
}

/// Lock-free counters shared between producers and the delivery worker
#[derive(Debug, Default)]
pub(crate) struct DeliveryCounters {
    broadcasts: AtomicU64,
    scheduled: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl DeliveryCounters {
    pub(crate) fn record_broadcast(&self, scheduled: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.scheduled.fetch_add(scheduled as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries_scheduled: self.scheduled.load(Ordering::Relaxed),
            deliveries_succeeded: self.succeeded.load(Ordering::Relaxed),
            delivery_failures: self.failed.load(Ordering::Relaxed),
        }
    }
}
