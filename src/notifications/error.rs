//! Notification System Error Types

use thiserror::Error;

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Error type returned by subscriber callbacks
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the notification system
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotificationError {
    /// A subscriber callback returned an error while handling a message
    #[error("Failed to deliver '{message}' to subscriber {subscriber}: {reason}")]
    DeliveryFailed {
        subscriber: String,
        message: String,
        reason: String,
    },

    /// A subscriber callback panicked while handling a message
    #[error("Subscriber {subscriber} panicked while handling '{message}': {reason}")]
    SubscriberPanicked {
        subscriber: String,
        message: String,
        reason: String,
    },

    /// The delivery worker thread could not be started
    #[error("Failed to spawn delivery worker '{name}': {reason}")]
    WorkerSpawn { name: String, reason: String },

    /// The delivery worker thread terminated abnormally
    #[error("Delivery worker '{name}' could not be joined")]
    WorkerJoin { name: String },

    /// Invalid dispatcher configuration
    #[error("Invalid dispatcher configuration: {0}")]
    InvalidConfiguration(String),
}

impl NotificationError {
    /// Create a delivery failed error
    pub fn delivery_failed(
        subscriber: impl Into<String>,
        message: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DeliveryFailed {
            subscriber: subscriber.into(),
            message: message.into(),
            reason: reason.into(),
        }
    }

    /// Create a subscriber panicked error
    pub fn subscriber_panicked(
        subscriber: impl Into<String>,
        message: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SubscriberPanicked {
            subscriber: subscriber.into(),
            message: message.into(),
            reason: reason.into(),
        }
    }
}
