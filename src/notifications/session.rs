//! Per-session subscription state
//!
//! A view session is subscribed exactly when it is attached and its user has
//! opted in. Every lifecycle transition re-evaluates that condition, so the
//! session holds at most one subscriber and repeated transitions are no-ops.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::notifications::error::CallbackError;
use crate::notifications::manager::NotificationManager;
use crate::notifications::subscriber::SubscriberHandle;

type DeliveryCallback = Arc<dyn Fn(&str) -> Result<(), CallbackError> + Send + Sync>;

#[derive(Default)]
struct SessionState {
    attached: bool,
    opted_in: bool,
    subscriber: Option<SubscriberHandle>,
}

/// Subscription bookkeeping for one view session
pub struct SessionSubscription {
    name: String,
    manager: NotificationManager,
    callback: DeliveryCallback,
    state: Mutex<SessionState>,
}

impl SessionSubscription {
    /// Create a detached, opted-out session with an infallible delivery action
    pub fn new<F>(manager: NotificationManager, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self::fallible(manager, name, move |message| {
            callback(message);
            Ok(())
        })
    }

    /// Create a detached, opted-out session whose delivery action may fail
    pub fn fallible<F>(manager: NotificationManager, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&str) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            manager,
            callback: Arc::new(callback),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The view became visible to its user
    pub fn attach(&self) {
        let mut state = self.state.lock();
        state.attached = true;
        self.update_subscription(&mut state);
    }

    /// The view went away
    pub fn detach(&self) {
        let mut state = self.state.lock();
        state.attached = false;
        self.update_subscription(&mut state);
    }

    /// The user toggled the "subscribe to notifications" option
    pub fn set_opted_in(&self, opted_in: bool) {
        let mut state = self.state.lock();
        state.opted_in = opted_in;
        self.update_subscription(&mut state);
    }

    pub fn is_attached(&self) -> bool {
        self.state.lock().attached
    }

    pub fn is_opted_in(&self) -> bool {
        self.state.lock().opted_in
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().subscriber.is_some()
    }

    /// Subscriber currently registered for this session, if any
    pub fn subscriber(&self) -> Option<SubscriberHandle> {
        self.state.lock().subscriber.clone()
    }

    fn update_subscription(&self, state: &mut SessionState) {
        let eligible = state.attached && state.opted_in;

        match (eligible, state.subscriber.take()) {
            (true, Some(existing)) => state.subscriber = Some(existing),
            (true, None) => {
                let callback = Arc::clone(&self.callback);
                let name = self.name.clone();
                let subscriber = SubscriberHandle::try_from_fn(name, move |m| callback(m));
                self.manager.subscribe(subscriber.clone());
                debug!("Session '{}' subscribed as {}", self.name, subscriber);
                state.subscriber = Some(subscriber);
            }
            (false, Some(existing)) => {
                self.manager.unsubscribe(&existing);
                debug!("Session '{}' unsubscribed", self.name);
            }
            (false, None) => {}
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(subscriber) = self.state.get_mut().subscriber.take() {
            self.manager.unsubscribe(&subscriber);
        }
    }
}
