//! Subscriber Callbacks
//!
//! A subscriber is an opaque callback receiving broadcast messages. Handles
//! compare by reference identity: two handles are equal only when they were
//! cloned from the same registration, regardless of what the callbacks do.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::notifications::error::CallbackError;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Trait for components that receive broadcast messages
pub trait Subscriber: Send + Sync {
    /// Handle a single broadcast message
    fn deliver(&self, message: &str) -> Result<(), CallbackError>;

    /// Human readable name used in log output
    fn subscriber_name(&self) -> String {
        "anonymous".to_string()
    }
}

/// Closure adapter for [`Subscriber`]
struct FnSubscriber<F> {
    name: String,
    callback: F,
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&str) -> Result<(), CallbackError> + Send + Sync,
{
    fn deliver(&self, message: &str) -> Result<(), CallbackError> {
        (self.callback)(message)
    }

    fn subscriber_name(&self) -> String {
        self.name.clone()
    }
}

/// Shared, identity-comparable handle to a subscriber
#[derive(Clone)]
pub struct SubscriberHandle {
    id: u64,
    name: Arc<str>,
    inner: Arc<dyn Subscriber>,
}

impl SubscriberHandle {
    /// Wrap a subscriber implementation in a new handle
    pub fn new<S>(subscriber: S) -> Self
    where
        S: Subscriber + 'static,
    {
        Self::from_arc(Arc::new(subscriber))
    }

    /// Wrap an already shared subscriber in a new handle
    pub fn from_arc(subscriber: Arc<dyn Subscriber>) -> Self {
        let name: Arc<str> = subscriber.subscriber_name().into();
        Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            name,
            inner: subscriber,
        }
    }

    /// Create a handle from an infallible closure
    pub fn from_fn<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self::try_from_fn(name, move |message| {
            callback(message);
            Ok(())
        })
    }

    /// Create a handle from a closure that may fail
    pub fn try_from_fn<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self::new(FnSubscriber {
            name: name.into(),
            callback,
        })
    }

    /// Numeric id assigned at creation, for logging only
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the underlying callback
    pub fn deliver(&self, message: &str) -> Result<(), CallbackError> {
        self.inner.deliver(message)
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl PartialEq for SubscriberHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for SubscriberHandle {}

impl Hash for SubscriberHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id, self.name)
    }
}

impl fmt::Debug for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
