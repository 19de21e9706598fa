//! Order commands.

use catalog_store::{ContactId, OrderId, UserId};

/// Command to submit the caller's basket as a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkout {
    /// The buyer submitting the basket.
    pub user_id: UserId,

    /// The basket to submit.
    pub order_id: OrderId,

    /// Delivery contact, owned by the same buyer.
    pub contact_id: ContactId,
}

impl Checkout {
    /// Creates a new Checkout command.
    pub fn new(user_id: UserId, order_id: OrderId, contact_id: ContactId) -> Self {
        Self {
            user_id,
            order_id,
            contact_id,
        }
    }
}
