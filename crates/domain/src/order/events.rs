//! Outbound order events.

use catalog_store::{OrderId, OrderStatus, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Events emitted after an order change has been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order moved to a new status.
    OrderStatusChanged(OrderStatusChangedData),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
        }
    }

    pub fn status_changed(user_id: UserId, order_id: OrderId, state: OrderStatus) -> Self {
        OrderEvent::OrderStatusChanged(OrderStatusChangedData {
            user_id,
            order_id,
            state,
        })
    }
}

/// Data for OrderStatusChanged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedData {
    /// The buyer to notify.
    pub user_id: UserId,

    /// The order that changed.
    pub order_id: OrderId,

    /// The status it moved to.
    pub state: OrderStatus,
}

/// Error returned when an event could not be handed off.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("event channel is full")]
    Full,

    #[error("event channel is closed")]
    Closed,
}

/// Fire-and-forget sink for order events.
///
/// Publishing never blocks and never waits for delivery.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: OrderEvent) -> Result<(), PublishError>;
}
