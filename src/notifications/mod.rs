//! In-process Broadcast Notifications
//!
//! A minimal pub/sub core: views register subscriber callbacks while they are
//! live, and any thread can broadcast a message to every current subscriber
//! without waiting for delivery.
//!
//! # Architecture
//!
//! - **SubscriberRegistry**: lock-guarded set of subscribers with copy-on-read snapshots
//! - **Dispatcher**: single background worker delivering messages, one failure
//!   boundary per callback
//! - **NotificationManager**: the facade views talk to (`subscribe`, `unsubscribe`, `notify_all`)
//! - **SessionSubscription**: subscribe-while-attached-and-opted-in bookkeeping
//!   for one view session
//!
//! # Example Usage
//!
//! ```no_run
//! use notify_users::notifications::{NotificationManager, SubscriberHandle};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = NotificationManager::new()?;
//! let subscriber = SubscriberHandle::from_fn("session-1", |message| println!("{}", message));
//!
//! manager.subscribe(subscriber.clone());
//! manager.notify_all("Deployment finished");
//! manager.unsubscribe(&subscriber);
//! manager.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod registry;
pub mod session;
pub mod stats;
pub mod subscriber;

#[cfg(test)]
mod tests;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{CallbackError, NotificationError, NotificationResult};
pub use manager::NotificationManager;
pub use registry::SubscriberRegistry;
pub use session::SessionSubscription;
pub use stats::DeliveryStats;
pub use subscriber::{Subscriber, SubscriberHandle};
