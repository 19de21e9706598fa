//! Order notifications.
//!
//! Checkout hands [`OrderEvent`]s to a [`ChannelPublisher`] without waiting;
//! a [`NotificationWorker`] task drains the channel and delivers each event
//! through a [`Notifier`], retrying failed deliveries.

pub mod error;
pub mod notifier;
pub mod publisher;
pub mod worker;

pub use domain::OrderEvent;
pub use error::NotificationError;
pub use notifier::{InMemoryNotifier, LogNotifier, Notifier};
pub use publisher::{ChannelPublisher, channel};
pub use worker::{NotificationWorker, WorkerConfig, WorkerStats};
