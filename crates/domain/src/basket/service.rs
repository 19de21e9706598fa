//! Basket service implementing the reservation protocol.

use std::time::Instant;

use catalog_store::{CatalogStore, NewLineItem, OrderDetails, OrderScope, StoreTransaction, UserId};

use crate::error::{DomainError, ReservationError};

use super::{AddItems, RemoveItems, UpdateItems};

/// Rolls back and reports the collected errors.
async fn abort<T: StoreTransaction, R>(
    tx: T,
    errors: Vec<ReservationError>,
) -> Result<R, DomainError> {
    tx.rollback().await?;
    Err(DomainError::Rejected(errors))
}

fn record(operation: &'static str, started: Instant, result: &Result<u64, DomainError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(DomainError::Rejected(_)) => "rejected",
        Err(DomainError::BasketNotFound | DomainError::NothingMatched) => "not_found",
        Err(_) => "error",
    };
    metrics::counter!("basket_reservations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("basket_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
}

fn conflict(error: ReservationError) -> ReservationError {
    metrics::counter!("basket_stock_conflicts_total").increment(1);
    error
}

/// Service moving quantity between the stock ledger and baskets.
///
/// Each mutating call runs as one store transaction that either commits
/// completely or leaves no trace.
pub struct BasketService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> BasketService<S> {
    /// Creates a new basket service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the user's basket with its lines, or nothing if none exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_basket(&self, user_id: UserId) -> Result<Vec<OrderDetails>, DomainError> {
        Ok(self
            .store
            .orders_for_user(user_id, OrderScope::Basket)
            .await?)
    }

    /// Reserves stock into the user's basket.
    ///
    /// Returns the number of distinct lines created or merged into.
    #[tracing::instrument(skip(self), fields(user_id = %cmd.user_id))]
    pub async fn add_items(&self, cmd: AddItems) -> Result<u64, DomainError> {
        let started = Instant::now();
        let result = self.reserve(&cmd).await;
        record("add", started, &result);
        result
    }

    /// Changes reserved quantities of lines in the user's basket.
    ///
    /// Returns the number of lines updated (including released ones).
    #[tracing::instrument(skip(self), fields(user_id = %cmd.user_id))]
    pub async fn update_items(&self, cmd: UpdateItems) -> Result<u64, DomainError> {
        let started = Instant::now();
        let result = self.rebalance(&cmd).await;
        record("update", started, &result);
        result
    }

    /// Releases and deletes lines from the user's basket.
    ///
    /// Returns the number of lines deleted.
    #[tracing::instrument(skip(self), fields(user_id = %cmd.user_id))]
    pub async fn remove_items(&self, cmd: RemoveItems) -> Result<u64, DomainError> {
        let started = Instant::now();
        let result = self.release(&cmd).await;
        record("remove", started, &result);
        result
    }

    /// Advisory check against committed stock, before any transaction.
    async fn precheck(&self, cmd: &AddItems) -> Result<(), DomainError> {
        let mut errors = Vec::new();
        for (stock_entry_id, requested) in cmd.requested_totals() {
            match self.store.stock_entry(stock_entry_id).await? {
                Some(entry) if entry.shop_accepts_orders => {
                    if entry.quantity < requested {
                        errors.push(ReservationError::InsufficientStock {
                            stock_entry_id,
                            product: entry.product_name,
                            available: entry.quantity,
                            requested,
                        });
                    }
                }
                _ => errors.push(ReservationError::StockEntryNotFound(stock_entry_id)),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Rejected(errors))
        }
    }

    async fn reserve(&self, cmd: &AddItems) -> Result<u64, DomainError> {
        cmd.validate().map_err(DomainError::Rejected)?;
        self.precheck(cmd).await?;

        let mut tx = self.store.begin().await?;
        let basket = tx.get_or_create_basket(cmd.user_id).await?;

        let mut created = 0;
        for (stock_entry_id, quantity) in cmd.requested_totals() {
            let entry = match tx.stock_entry(stock_entry_id).await? {
                Some(entry) if entry.shop_accepts_orders => entry,
                _ => {
                    let error = ReservationError::StockEntryNotFound(stock_entry_id);
                    return abort(tx, vec![error]).await;
                }
            };

            if !tx.try_decrement_stock(entry.id, quantity).await? {
                tracing::warn!(stock_entry_id = %entry.id, requested = quantity, "guarded decrement lost");
                let error = conflict(ReservationError::ConcurrentModification(entry.id));
                return abort(tx, vec![error]).await;
            }

            tx.upsert_line_item(
                basket.id,
                NewLineItem {
                    stock_entry_id: entry.id,
                    quantity,
                    price: entry.price,
                },
            )
            .await?;
            created += 1;
        }

        tx.commit().await?;
        tracing::info!(basket_id = %basket.id, created, "items reserved");
        Ok(created)
    }

    async fn rebalance(&self, cmd: &UpdateItems) -> Result<u64, DomainError> {
        cmd.validate().map_err(DomainError::Rejected)?;

        let mut tx = self.store.begin().await?;
        let Some(basket) = tx.find_basket(cmd.user_id).await? else {
            let errors = cmd
                .lines
                .iter()
                .map(|line| ReservationError::LineItemNotFound(line.line_item_id))
                .collect();
            return abort(tx, errors).await;
        };

        let mut errors = Vec::new();
        let mut updated = 0;
        for change in &cmd.lines {
            let Some(line) = tx.line_item(basket.id, change.line_item_id).await? else {
                errors.push(ReservationError::LineItemNotFound(change.line_item_id));
                continue;
            };

            tx.increment_stock(line.stock_entry_id, line.quantity).await?;

            if change.quantity == 0 {
                tx.delete_line_items(&[line.id]).await?;
                updated += 1;
                continue;
            }

            let Some(entry) = tx.stock_entry(line.stock_entry_id).await? else {
                errors.push(ReservationError::StockEntryNotFound(line.stock_entry_id));
                continue;
            };
            if entry.quantity < change.quantity {
                errors.push(ReservationError::InsufficientStock {
                    stock_entry_id: entry.id,
                    product: entry.product_name,
                    available: entry.quantity,
                    requested: change.quantity,
                });
                continue;
            }
            if !tx.try_decrement_stock(entry.id, change.quantity).await? {
                errors.push(conflict(ReservationError::ConcurrentModification(entry.id)));
                continue;
            }
            tx.set_line_quantity(line.id, change.quantity).await?;
            updated += 1;
        }

        if !errors.is_empty() {
            return abort(tx, errors).await;
        }
        tx.commit().await?;
        tracing::info!(basket_id = %basket.id, updated, "basket quantities updated");
        Ok(updated)
    }

    async fn release(&self, cmd: &RemoveItems) -> Result<u64, DomainError> {
        let mut tx = self.store.begin().await?;
        let Some(basket) = tx.find_basket(cmd.user_id).await? else {
            tx.rollback().await?;
            return Err(DomainError::BasketNotFound);
        };

        let lines = tx.lines_in_order(basket.id, &cmd.line_item_ids).await?;
        if lines.is_empty() {
            tx.rollback().await?;
            return Err(DomainError::NothingMatched);
        }

        for line in &lines {
            tx.increment_stock(line.stock_entry_id, line.quantity).await?;
        }
        let ids: Vec<_> = lines.iter().map(|line| line.id).collect();
        let deleted = tx.delete_line_items(&ids).await?;

        tx.commit().await?;
        tracing::info!(basket_id = %basket.id, deleted, "items removed");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::{AddLine, UpdateLine};
    use crate::error::ErrorKind;
    use catalog_store::{
        InMemoryCatalogStore, LineItemId, Money, NewStockEntry, StockEntry, StockEntryId, UserKind,
    };

    struct Fixture {
        service: BasketService<InMemoryCatalogStore>,
        store: InMemoryCatalogStore,
        user: UserId,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryCatalogStore::new();
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;
        Fixture {
            service: BasketService::new(store.clone()),
            store,
            user: user.id,
        }
    }

    async fn entry(store: &InMemoryCatalogStore, quantity: u32) -> StockEntry {
        let shop = store.add_shop(format!("Shop {quantity}"), None, true).await;
        store
            .add_stock_entry(NewStockEntry {
                shop_id: shop.id,
                product_name: "Phone".to_string(),
                model: "X-1".to_string(),
                quantity,
                price: Money::new(250),
                price_rrc: Money::new(300),
            })
            .await
    }

    async fn available(store: &InMemoryCatalogStore, id: StockEntryId) -> u32 {
        store.stock_entry(id).await.unwrap().unwrap().quantity
    }

    fn add(user: UserId, lines: &[(StockEntryId, u32)]) -> AddItems {
        AddItems::new(
            user,
            lines
                .iter()
                .map(|&(stock_entry_id, quantity)| AddLine {
                    stock_entry_id,
                    quantity,
                })
                .collect(),
        )
    }

    fn update(user: UserId, lines: &[(LineItemId, u32)]) -> UpdateItems {
        UpdateItems::new(
            user,
            lines
                .iter()
                .map(|&(line_item_id, quantity)| UpdateLine {
                    line_item_id,
                    quantity,
                })
                .collect(),
        )
    }

    async fn only_line(f: &Fixture) -> catalog_store::LineItem {
        let baskets = f.service.get_basket(f.user).await.unwrap();
        assert_eq!(baskets.len(), 1);
        assert_eq!(baskets[0].lines.len(), 1);
        baskets[0].lines[0].line.clone()
    }

    #[tokio::test]
    async fn reserve_then_reject_overdraw() {
        let f = fixture().await;
        let e = entry(&f.store, 10).await;

        let created = f.service.add_items(add(f.user, &[(e.id, 7)])).await.unwrap();
        assert_eq!(created, 1);
        assert_eq!(available(&f.store, e.id).await, 3);

        let err = f
            .service
            .add_items(add(f.user, &[(e.id, 5)]))
            .await
            .unwrap_err();
        assert_eq!(
            err.reasons(),
            &[ReservationError::InsufficientStock {
                stock_entry_id: e.id,
                product: "Phone".to_string(),
                available: 3,
                requested: 5,
            }]
        );
        assert_eq!(available(&f.store, e.id).await, 3);
    }

    #[tokio::test]
    async fn update_can_use_stock_released_by_the_line_itself() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        f.service.add_items(add(f.user, &[(e.id, 2)])).await.unwrap();
        let line = only_line(&f).await;
        assert_eq!(available(&f.store, e.id).await, 3);

        let updated = f
            .service
            .update_items(update(f.user, &[(line.id, 5)]))
            .await
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(available(&f.store, e.id).await, 0);
        assert_eq!(only_line(&f).await.quantity, 5);
    }

    #[tokio::test]
    async fn update_beyond_stock_changes_nothing() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        f.service.add_items(add(f.user, &[(e.id, 2)])).await.unwrap();
        let line = only_line(&f).await;

        let err = f
            .service
            .update_items(update(f.user, &[(line.id, 6)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err.reasons(),
            [ReservationError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            }]
        ));
        assert_eq!(available(&f.store, e.id).await, 3);
        assert_eq!(only_line(&f).await.quantity, 2);
    }

    #[tokio::test]
    async fn update_to_zero_releases_and_deletes_the_line() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        f.service.add_items(add(f.user, &[(e.id, 2)])).await.unwrap();
        let line = only_line(&f).await;

        let updated = f
            .service
            .update_items(update(f.user, &[(line.id, 0)]))
            .await
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(available(&f.store, e.id).await, 5);
        assert_eq!(f.store.line_count().await, 0);
    }

    #[tokio::test]
    async fn update_batch_is_all_or_nothing() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        f.service.add_items(add(f.user, &[(e.id, 2)])).await.unwrap();
        let line = only_line(&f).await;
        let missing = LineItemId::new(9999);

        let err = f
            .service
            .update_items(update(f.user, &[(line.id, 4), (missing, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.reasons(), &[ReservationError::LineItemNotFound(missing)]);
        assert_eq!(available(&f.store, e.id).await, 3);
        assert_eq!(only_line(&f).await.quantity, 2);
    }

    #[tokio::test]
    async fn update_without_basket_reports_every_line() {
        let f = fixture().await;
        let err = f
            .service
            .update_items(update(f.user, &[(LineItemId::new(1), 1), (LineItemId::new(2), 1)]))
            .await
            .unwrap_err();
        assert_eq!(err.reasons().len(), 2);
    }

    #[tokio::test]
    async fn remove_returns_reserved_quantity() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        f.service.add_items(add(f.user, &[(e.id, 4)])).await.unwrap();
        let line = only_line(&f).await;
        assert_eq!(available(&f.store, e.id).await, 1);

        let cmd = RemoveItems::parse(f.user, &line.id.to_string()).unwrap();
        let deleted = f.service.remove_items(cmd).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(available(&f.store, e.id).await, 5);
    }

    #[tokio::test]
    async fn removing_twice_returns_stock_once() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        f.service.add_items(add(f.user, &[(e.id, 4)])).await.unwrap();
        let line = only_line(&f).await;
        let raw = format!("{},{}", line.id, line.id);

        let first = f
            .service
            .remove_items(RemoveItems::parse(f.user, &raw).unwrap())
            .await
            .unwrap();
        let second = f
            .service
            .remove_items(RemoveItems::parse(f.user, &raw).unwrap())
            .await;

        assert_eq!(first, 1);
        assert!(matches!(second, Err(DomainError::NothingMatched)));
        assert_eq!(available(&f.store, e.id).await, 5);
    }

    #[tokio::test]
    async fn remove_without_basket_is_not_found() {
        let f = fixture().await;
        let result = f
            .service
            .remove_items(RemoveItems::parse(f.user, "1").unwrap())
            .await;
        assert!(matches!(result, Err(DomainError::BasketNotFound)));
    }

    #[tokio::test]
    async fn missing_entry_rejects_the_whole_batch() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;
        let missing = StockEntryId::new(9999);

        let err = f
            .service
            .add_items(add(f.user, &[(e.id, 1), (missing, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.reasons(), &[ReservationError::StockEntryNotFound(missing)]);
        assert_eq!(available(&f.store, e.id).await, 5);
        assert_eq!(f.store.line_count().await, 0);
    }

    #[tokio::test]
    async fn precheck_collects_every_problem() {
        let f = fixture().await;
        let e = entry(&f.store, 2).await;

        let err = f
            .service
            .add_items(add(
                f.user,
                &[(e.id, 1), (StockEntryId::new(404), 1), (e.id, 2)],
            ))
            .await
            .unwrap_err();

        let kinds: Vec<_> = err.reasons().iter().map(|r| r.kind()).collect();
        assert_eq!(kinds, vec![ErrorKind::InsufficientStock, ErrorKind::NotFound]);
    }

    #[tokio::test]
    async fn closed_shop_stock_is_not_found() {
        let f = fixture().await;
        let owner = f.store.add_user("shop@example.com", UserKind::Shop).await;
        let shop = f.store.add_shop("Closed", Some(owner.id), false).await;
        let e = f
            .store
            .add_stock_entry(NewStockEntry {
                shop_id: shop.id,
                product_name: "Phone".to_string(),
                model: String::new(),
                quantity: 5,
                price: Money::new(100),
                price_rrc: Money::new(100),
            })
            .await;

        let err = f.service.add_items(add(f.user, &[(e.id, 1)])).await.unwrap_err();
        assert_eq!(err.reasons(), &[ReservationError::StockEntryNotFound(e.id)]);
    }

    #[tokio::test]
    async fn adding_the_same_entry_merges_lines() {
        let f = fixture().await;
        let e = entry(&f.store, 10).await;

        f.service.add_items(add(f.user, &[(e.id, 2)])).await.unwrap();
        f.service.add_items(add(f.user, &[(e.id, 3)])).await.unwrap();

        assert_eq!(only_line(&f).await.quantity, 5);
        assert_eq!(available(&f.store, e.id).await, 5);
    }

    #[tokio::test]
    async fn repeated_entry_in_one_batch_counts_one_line() {
        let f = fixture().await;
        let e = entry(&f.store, 10).await;

        let created = f
            .service
            .add_items(add(f.user, &[(e.id, 1), (e.id, 2)]))
            .await
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(only_line(&f).await.quantity, 3);
        assert_eq!(available(&f.store, e.id).await, 7);
        assert_eq!(f.store.line_count().await, 1);
    }

    #[tokio::test]
    async fn basket_total_uses_price_snapshot() {
        let f = fixture().await;
        let e = entry(&f.store, 10).await;
        f.service.add_items(add(f.user, &[(e.id, 3)])).await.unwrap();

        let baskets = f.service.get_basket(f.user).await.unwrap();
        assert_eq!(baskets[0].total(), Money::new(750));
    }

    #[tokio::test]
    async fn conservation_holds_across_operations() {
        let f = fixture().await;
        let e = entry(&f.store, 20).await;
        let other = f.store.add_user("other@example.com", UserKind::Buyer).await;

        f.service.add_items(add(f.user, &[(e.id, 6)])).await.unwrap();
        f.service.add_items(add(other.id, &[(e.id, 4)])).await.unwrap();
        let line = only_line(&f).await;
        f.service
            .update_items(update(f.user, &[(line.id, 9)]))
            .await
            .unwrap();
        let _ = f.service.add_items(add(other.id, &[(e.id, 50)])).await;
        f.service
            .remove_items(RemoveItems::parse(f.user, &line.id.to_string()).unwrap())
            .await
            .unwrap();

        let total = available(&f.store, e.id).await + f.store.allocated_quantity(e.id).await;
        assert_eq!(total, 20);
    }

    #[tokio::test]
    async fn stale_precheck_loses_to_committed_reservation() {
        let f = fixture().await;
        let e = entry(&f.store, 5).await;

        // Hold the writer so the service's transaction waits behind it.
        let mut tx = f.store.begin().await.unwrap();
        assert!(tx.try_decrement_stock(e.id, 5).await.unwrap());

        let service = BasketService::new(f.store.clone());
        let (user, id) = (f.user, e.id);
        let pending = tokio::spawn(async move { service.add_items(add(user, &[(id, 5)])).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.commit().await.unwrap();

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err.reasons(), &[ReservationError::ConcurrentModification(id)]);
        assert_eq!(available(&f.store, id).await, 0);
    }

    #[tokio::test]
    async fn concurrent_full_stock_requests_have_one_winner() {
        let f = fixture().await;
        let e = entry(&f.store, 4).await;
        let a = f.store.add_user("a@example.com", UserKind::Buyer).await;
        let b = f.store.add_user("b@example.com", UserKind::Buyer).await;

        let (first, second) = tokio::join!(
            f.service.add_items(add(a.id, &[(e.id, 4)])),
            f.service.add_items(add(b.id, &[(e.id, 4)])),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(
            loser.reasons()[0].kind(),
            ErrorKind::ConcurrentModification | ErrorKind::InsufficientStock
        ));
        assert_eq!(available(&f.store, e.id).await, 0);
        assert_eq!(f.store.allocated_quantity(e.id).await, 4);
    }
}
