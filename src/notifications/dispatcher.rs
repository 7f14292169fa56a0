//! Broadcast Dispatcher
//!
//! Delivers broadcast messages on a single dedicated worker thread. Callers
//! of [`Dispatcher::notify_all`] only take a registry snapshot and enqueue one
//! job per subscriber; the worker runs the callbacks in queue order, so each
//! subscriber sees broadcasts in the order they were enqueued.
//!
//! Every callback runs behind its own error and panic boundary. A failing
//! subscriber is logged and counted, and the worker moves on to the next job.
//! A callback that never returns stalls every later delivery: there is one
//! worker and no per-delivery timeout.
//!
//! Callbacks may call back into the dispatcher. `flush` and `shutdown` never
//! wait on the worker from the worker itself; they return without blocking.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{self, Receiver, Sender};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::notifications::error::{NotificationError, NotificationResult};
use crate::notifications::registry::SubscriberRegistry;
use crate::notifications::stats::{DeliveryCounters, DeliveryStats};
use crate::notifications::subscriber::SubscriberHandle;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// Name given to the delivery worker thread
    pub worker_name: String,
    /// Deliveries slower than this are reported as stalling the worker
    pub slow_delivery_threshold: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_name: "notify-users-worker".to_string(),
            slow_delivery_threshold: Duration::from_millis(1000),
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> NotificationResult<()> {
        if self.worker_name.trim().is_empty() {
            return Err(NotificationError::InvalidConfiguration(
                "worker name must not be empty".to_string(),
            ));
        }
        if self.slow_delivery_threshold.is_zero() {
            return Err(NotificationError::InvalidConfiguration(
                "slow delivery threshold must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Work items processed by the delivery worker
enum Job {
    Deliver {
        subscriber: SubscriberHandle,
        message: Arc<str>,
    },
    /// Acknowledged once every job queued before it has run
    Flush(Sender<()>),
}

/// Asynchronous fan-out of messages to registry subscribers
pub struct Dispatcher {
    registry: Arc<SubscriberRegistry>,
    config: DispatcherConfig,
    sender: Mutex<Option<Sender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    counters: Arc<DeliveryCounters>,
}

impl Dispatcher {
    /// Spawn the delivery worker for the given registry
    pub fn start(
        registry: Arc<SubscriberRegistry>,
        config: DispatcherConfig,
    ) -> NotificationResult<Self> {
        config.validate()?;

        let (sender, receiver) = crossbeam_channel::unbounded();
        let counters = Arc::new(DeliveryCounters::default());
        let worker_counters = Arc::clone(&counters);
        let slow_threshold = config.slow_delivery_threshold;

        let handle = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || Self::worker_loop(receiver, worker_counters, slow_threshold))
            .map_err(|e| NotificationError::WorkerSpawn {
                name: config.worker_name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Started delivery worker '{}'", config.worker_name);

        Ok(Self {
            registry,
            config,
            sender: Mutex::new(Some(sender)),
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
            counters,
        })
    }

    /// Schedule delivery of `message` to every current subscriber.
    ///
    /// Returns the number of deliveries scheduled without waiting for any of
    /// them. After shutdown nothing is scheduled and 0 is returned.
    pub fn notify_all(&self, message: &str) -> usize {
        let Some(sender) = self.sender.lock().clone() else {
            warn!("Dropping broadcast '{}': dispatcher has been shut down", message);
            return 0;
        };

        let snapshot = self.registry.snapshot();
        let message: Arc<str> = Arc::from(message);
        self.counters.record_broadcast(snapshot.len());

        let mut scheduled = 0;
        for subscriber in snapshot {
            let job = Job::Deliver {
                subscriber,
                message: Arc::clone(&message),
            };
            if let Err(e) = sender.send(job) {
                if let Job::Deliver { subscriber, .. } = e.into_inner() {
                    error!(
                        "Delivery worker is gone; could not schedule '{}' for {}",
                        message, subscriber
                    );
                    self.counters.record_failure();
                }
                continue;
            }
            scheduled += 1;
        }

        debug!("Scheduled broadcast '{}' to {} subscribers", message, scheduled);
        scheduled
    }

    /// Block until every delivery queued before this call has run.
    ///
    /// Called from inside a subscriber callback this returns immediately:
    /// the worker cannot wait for its own queue.
    pub fn flush(&self) {
        if self.on_worker() {
            warn!("flush() called from a subscriber callback; not waiting on the worker");
            return;
        }
        if let Some(done) = self.request_flush() {
            let _ = done.recv();
        }
    }

    /// Like [`flush`](Self::flush) but gives up after `timeout`.
    ///
    /// Returns `false` when the worker did not catch up in time, which
    /// happens when a subscriber callback is still running, or when called
    /// from a subscriber callback.
    pub fn flush_timeout(&self, timeout: Duration) -> bool {
        if self.on_worker() {
            warn!("flush_timeout() called from a subscriber callback; not waiting on the worker");
            return false;
        }
        match self.request_flush() {
            Some(done) => done.recv_timeout(timeout).is_ok(),
            None => true,
        }
    }

    fn request_flush(&self) -> Option<Receiver<()>> {
        let sender = self.sender.lock().clone()?;
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        sender.send(Job::Flush(done_tx)).ok()?;
        Some(done_rx)
    }

    /// Stop accepting broadcasts, let the worker drain its queue and join it.
    ///
    /// Concurrent callers all return once the worker has been joined. Called
    /// from a subscriber callback, broadcasts stop but the join is left to a
    /// later call (or to the worker simply exiting once its queue is empty).
    pub fn shutdown(&self) -> NotificationResult<()> {
        // Dropping the last sender lets the worker exit once the queue is empty
        drop(self.sender.lock().take());

        if self.on_worker() {
            debug!(
                "Shutdown requested on worker '{}'; it exits once its queue drains",
                self.config.worker_name
            );
            return Ok(());
        }

        // Held across the join so concurrent callers wait for it to finish
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            handle.join().map_err(|_| NotificationError::WorkerJoin {
                name: self.config.worker_name.clone(),
            })?;
            debug!("Delivery worker '{}' stopped", self.config.worker_name);
        }
        Ok(())
    }

    fn on_worker(&self) -> bool {
        thread::current().id() == self.worker_id
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    fn worker_loop(
        receiver: Receiver<Job>,
        counters: Arc<DeliveryCounters>,
        slow_threshold: Duration,
    ) {
        for job in receiver.iter() {
            match job {
                Job::Deliver { subscriber, message } => {
                    match Self::deliver(&subscriber, &message, slow_threshold) {
                        Ok(()) => counters.record_success(),
                        Err(e) => {
                            counters.record_failure();
                            error!("{}", e);
                        }
                    }
                }
                Job::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        trace!("Delivery queue closed, worker exiting");
    }

    fn deliver(
        subscriber: &SubscriberHandle,
        message: &str,
        slow_threshold: Duration,
    ) -> NotificationResult<()> {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.deliver(message)));
        let elapsed = start.elapsed();

        if elapsed > slow_threshold {
            warn!(
                "Subscriber {} took {:?} to handle '{}'; later deliveries were held up",
                subscriber, elapsed, message
            );
        }

        match outcome {
            Ok(Ok(())) => {
                trace!("Delivered '{}' to {} in {:?}", message, subscriber, elapsed);
                Ok(())
            }
            Ok(Err(e)) => Err(NotificationError::delivery_failed(
                subscriber.to_string(),
                message,
                e.to_string(),
            )),
            Err(payload) => Err(NotificationError::subscriber_panicked(
                subscriber.to_string(),
                message,
                panic_reason(payload.as_ref()),
            )),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Error while stopping dispatcher: {}", e);
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
