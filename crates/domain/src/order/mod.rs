//! Order lifecycle after the basket: checkout and order history.

mod commands;
mod events;
mod service;

pub use commands::Checkout;
pub use events::{EventPublisher, OrderEvent, OrderStatusChangedData, PublishError};
pub use service::OrderService;

use catalog_store::{ContactId, OrderId, OrderStatus};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The caller owns no order with this id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The caller owns no contact with this id.
    #[error("Contact not found: {0}")]
    ContactNotFound(ContactId),

    /// The basket has no line items.
    #[error("Order {0} has no items")]
    EmptyBasket(OrderId),

    /// Order is not in a state that allows the transition.
    #[error("Invalid state transition: cannot move from {current} to {target}")]
    InvalidStateTransition {
        current: OrderStatus,
        target: OrderStatus,
    },
}
