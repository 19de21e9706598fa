//! Notifier trait and implementations.

use std::sync::Arc;

use async_trait::async_trait;
use domain::OrderEvent;
use tokio::sync::Mutex;

use crate::error::NotificationError;

/// Delivers one order event to the buyer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotificationError>;
}

/// Notifier that writes each event to the log.
///
/// Stands in for the mail gateway, which lives outside this service.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(event)?;
        tracing::info!(event_type = event.event_type(), %payload, "order notification");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    delivered: Vec<OrderEvent>,
    attempts: usize,
    failures_left: u32,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` deliveries fail.
    pub async fn fail_next(&self, count: u32) {
        self.state.lock().await.failures_left = count;
    }

    /// Returns every event delivered so far.
    pub async fn delivered(&self) -> Vec<OrderEvent> {
        self.state.lock().await.delivered.clone()
    }

    /// Returns the number of delivery attempts, failed ones included.
    pub async fn attempts(&self) -> usize {
        self.state.lock().await.attempts
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, event: &OrderEvent) -> Result<(), NotificationError> {
        let mut state = self.state.lock().await;
        state.attempts += 1;

        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(NotificationError::Delivery(
                "mail gateway unavailable".to_string(),
            ));
        }

        state.delivered.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, OrderStatus, UserId};

    fn event() -> OrderEvent {
        OrderEvent::status_changed(UserId::new(1), OrderId::new(2), OrderStatus::New)
    }

    #[tokio::test]
    async fn records_deliveries() {
        let notifier = InMemoryNotifier::new();
        notifier.notify(&event()).await.unwrap();

        assert_eq!(notifier.delivered().await, vec![event()]);
        assert_eq!(notifier.attempts().await, 1);
    }

    #[tokio::test]
    async fn fails_the_requested_number_of_times() {
        let notifier = InMemoryNotifier::new();
        notifier.fail_next(2).await;

        assert!(notifier.notify(&event()).await.is_err());
        assert!(notifier.notify(&event()).await.is_err());
        assert!(notifier.notify(&event()).await.is_ok());
        assert_eq!(notifier.delivered().await.len(), 1);
        assert_eq!(notifier.attempts().await, 3);
    }

    #[tokio::test]
    async fn log_notifier_accepts_events() {
        assert!(LogNotifier.notify(&event()).await.is_ok());
    }
}
