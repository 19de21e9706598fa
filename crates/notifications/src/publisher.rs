//! Channel-backed event publisher.

use domain::{EventPublisher, OrderEvent, PublishError};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Publishes order events into a bounded channel without waiting.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<OrderEvent>,
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: OrderEvent) -> Result<(), PublishError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(dropped) => {
                metrics::counter!("notifications_failed_total", "reason" => "full").increment(1);
                tracing::warn!(event_type = dropped.event_type(), "notification channel full");
                PublishError::Full
            }
            TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}

/// Creates a publisher and the receiving end for a [`crate::NotificationWorker`].
pub fn channel(buffer: usize) -> (ChannelPublisher, mpsc::Receiver<OrderEvent>) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    (ChannelPublisher { sender }, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, OrderStatus, UserId};

    fn event(order: i64) -> OrderEvent {
        OrderEvent::status_changed(UserId::new(1), OrderId::new(order), OrderStatus::New)
    }

    #[tokio::test]
    async fn publish_hands_events_to_the_receiver() {
        let (publisher, mut receiver) = channel(4);
        publisher.publish(event(1)).unwrap();
        assert_eq!(receiver.recv().await, Some(event(1)));
    }

    #[test]
    fn full_channel_rejects_instead_of_waiting() {
        let (publisher, _receiver) = channel(1);
        publisher.publish(event(1)).unwrap();
        assert_eq!(publisher.publish(event(2)), Err(PublishError::Full));
    }

    #[test]
    fn closed_channel_is_reported() {
        let (publisher, receiver) = channel(1);
        drop(receiver);
        assert_eq!(publisher.publish(event(1)), Err(PublishError::Closed));
    }
}
