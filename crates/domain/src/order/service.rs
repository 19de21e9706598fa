//! Order service: checkout and order history.

use std::sync::Arc;

use catalog_store::{
    CatalogStore, Order, OrderDetails, OrderScope, OrderStatus, StoreTransaction, UserId,
};

use crate::error::DomainError;

use super::{Checkout, EventPublisher, OrderError, OrderEvent};

/// Service for submitted orders.
pub struct OrderService<S: CatalogStore> {
    store: S,
    publisher: Arc<dyn EventPublisher>,
}

impl<S: CatalogStore> OrderService<S> {
    /// Creates a new order service publishing to `publisher`.
    pub fn new(store: S, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Returns the caller's orders that have left the basket, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderDetails>, DomainError> {
        Ok(self
            .store
            .orders_for_user(user_id, OrderScope::Submitted)
            .await?)
    }

    /// Submits the caller's basket as a new order.
    ///
    /// The status change event is published only after the commit.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(&self, cmd: Checkout) -> Result<Order, DomainError> {
        let mut tx = self.store.begin().await?;

        let Some(mut order) = tx.order_for_update(cmd.user_id, cmd.order_id).await? else {
            return Err(OrderError::OrderNotFound(cmd.order_id).into());
        };
        if order.status != OrderStatus::Basket {
            return Err(OrderError::InvalidStateTransition {
                current: order.status,
                target: OrderStatus::New,
            }
            .into());
        }
        if tx.contact(cmd.user_id, cmd.contact_id).await?.is_none() {
            return Err(OrderError::ContactNotFound(cmd.contact_id).into());
        }
        if tx.count_lines(order.id).await? == 0 {
            return Err(OrderError::EmptyBasket(order.id).into());
        }

        let moved = tx
            .transition_order(
                order.id,
                OrderStatus::Basket,
                OrderStatus::New,
                Some(cmd.contact_id),
            )
            .await?;
        if !moved {
            return Err(OrderError::InvalidStateTransition {
                current: order.status,
                target: OrderStatus::New,
            }
            .into());
        }
        tx.commit().await?;

        order.status = OrderStatus::New;
        order.contact_id = Some(cmd.contact_id);
        metrics::counter!("orders_checked_out_total").increment(1);
        tracing::info!(order_id = %order.id, "order checked out");

        let event = OrderEvent::status_changed(order.user_id, order.id, order.status);
        if let Err(e) = self.publisher.publish(event) {
            tracing::warn!(order_id = %order.id, error = %e, "failed to publish order event");
        }

        Ok(order)
    }
}
