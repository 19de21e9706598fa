//! Notification error types.

use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The delivery backend refused or failed the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
