use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Contact, ContactId, LineDetails, LineItem, LineItemId, NewContact, NewLineItem,
    NewStockEntry, Order, OrderDetails, OrderId, OrderScope, OrderStatus, Result, Shop, ShopId,
    StockEntry, StockEntryId, StoreError, User, UserId, UserKind,
    store::{CatalogStore, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct CatalogState {
    users: BTreeMap<UserId, User>,
    tokens: HashMap<String, UserId>,
    shops: BTreeMap<ShopId, Shop>,
    stock: BTreeMap<StockEntryId, StockEntry>,
    orders: BTreeMap<OrderId, Order>,
    lines: BTreeMap<LineItemId, LineItem>,
    contacts: BTreeMap<ContactId, Contact>,
    last_id: i64,
}

impl CatalogState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn stock_view(&self, id: StockEntryId) -> Option<StockEntry> {
        let mut entry = self.stock.get(&id)?.clone();
        entry.shop_accepts_orders = self
            .shops
            .get(&entry.shop_id)
            .is_some_and(|shop| shop.accepts_orders);
        Some(entry)
    }

    fn basket_of(&self, user_id: UserId) -> Option<&Order> {
        self.orders
            .values()
            .find(|o| o.user_id == user_id && o.status == OrderStatus::Basket)
    }

    fn details(&self, order: &Order, shop_filter: Option<ShopId>) -> OrderDetails {
        let lines = self
            .lines
            .values()
            .filter(|line| line.order_id == order.id)
            .filter_map(|line| {
                let stock = self.stock_view(line.stock_entry_id)?;
                if shop_filter.is_some_and(|shop_id| stock.shop_id != shop_id) {
                    return None;
                }
                Some(LineDetails {
                    line: line.clone(),
                    stock,
                })
            })
            .collect();

        OrderDetails {
            order: order.clone(),
            lines,
        }
    }

    fn newest_first(mut orders: Vec<OrderDetails>) -> Vec<OrderDetails> {
        orders.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.order.id.cmp(&a.order.id))
        });
        orders
    }
}

/// In-memory catalog store implementation for tests and local runs.
///
/// Writers are serialized by a mutex and work on a private copy of the
/// state that replaces the committed state on commit. Reads outside a
/// transaction only ever observe committed state.
#[derive(Clone, Default)]
pub struct InMemoryCatalogStore {
    committed: Arc<RwLock<CatalogState>>,
    writer: Arc<Mutex<()>>,
}

impl InMemoryCatalogStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn write<R>(&self, f: impl FnOnce(&mut CatalogState) -> R) -> R {
        let _writer = self.writer.lock().await;
        let mut state = self.committed.write().await;
        f(&mut state)
    }

    /// Registers a user.
    pub async fn add_user(&self, email: impl Into<String>, kind: UserKind) -> User {
        let email = email.into();
        self.write(|state| {
            let user = User {
                id: UserId::new(state.next_id()),
                email,
                kind,
            };
            state.users.insert(user.id, user.clone());
            user
        })
        .await
    }

    /// Issues an access token for a user.
    pub async fn add_token(&self, user_id: UserId, token: impl Into<String>) {
        let token = token.into();
        self.write(|state| {
            state.tokens.insert(token, user_id);
        })
        .await
    }

    /// Registers a shop.
    pub async fn add_shop(
        &self,
        name: impl Into<String>,
        owner_id: Option<UserId>,
        accepts_orders: bool,
    ) -> Shop {
        let name = name.into();
        self.write(|state| {
            let shop = Shop {
                id: ShopId::new(state.next_id()),
                name,
                owner_id,
                accepts_orders,
            };
            state.shops.insert(shop.id, shop.clone());
            shop
        })
        .await
    }

    /// Imports a stock entry.
    pub async fn add_stock_entry(&self, entry: NewStockEntry) -> StockEntry {
        self.write(|state| {
            let shop_accepts_orders = state
                .shops
                .get(&entry.shop_id)
                .is_some_and(|shop| shop.accepts_orders);
            let stored = StockEntry {
                id: StockEntryId::new(state.next_id()),
                shop_id: entry.shop_id,
                product_name: entry.product_name,
                model: entry.model,
                quantity: entry.quantity,
                price: entry.price,
                price_rrc: entry.price_rrc,
                shop_accepts_orders,
            };
            state.stock.insert(stored.id, stored.clone());
            stored
        })
        .await
    }

    /// Sum of line quantities referencing a stock entry across every order.
    pub async fn allocated_quantity(&self, id: StockEntryId) -> u32 {
        self.committed
            .read()
            .await
            .lines
            .values()
            .filter(|line| line.stock_entry_id == id)
            .map(|line| line.quantity)
            .sum()
    }

    /// Returns the total number of line items stored.
    pub async fn line_count(&self) -> usize {
        self.committed.read().await.lines.len()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx> {
        let writer = self.writer.clone().lock_owned().await;
        let working = self.committed.read().await.clone();
        Ok(InMemoryTransaction {
            _writer: writer,
            committed: self.committed.clone(),
            working,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn stock_entry(&self, id: StockEntryId) -> Result<Option<StockEntry>> {
        Ok(self.committed.read().await.stock_view(id))
    }

    async fn list_stock_entries(&self, shop_id: Option<ShopId>) -> Result<Vec<StockEntry>> {
        let state = self.committed.read().await;
        Ok(state
            .stock
            .keys()
            .filter_map(|id| state.stock_view(*id))
            .filter(|entry| entry.shop_accepts_orders)
            .filter(|entry| shop_id.is_none_or(|shop_id| entry.shop_id == shop_id))
            .collect())
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let state = self.committed.read().await;
        Ok(state
            .tokens
            .get(token)
            .and_then(|user_id| state.users.get(user_id))
            .cloned())
    }

    async fn shop_by_owner(&self, owner_id: UserId) -> Result<Option<Shop>> {
        let state = self.committed.read().await;
        Ok(state
            .shops
            .values()
            .find(|shop| shop.owner_id == Some(owner_id))
            .cloned())
    }

    async fn set_shop_accepts_orders(
        &self,
        owner_id: UserId,
        accepts: bool,
    ) -> Result<Option<Shop>> {
        Ok(self
            .write(|state| {
                let shop = state
                    .shops
                    .values_mut()
                    .find(|shop| shop.owner_id == Some(owner_id))?;
                shop.accepts_orders = accepts;
                Some(shop.clone())
            })
            .await)
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
        scope: OrderScope,
    ) -> Result<Vec<OrderDetails>> {
        let state = self.committed.read().await;
        let orders = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id && scope.includes(o.status))
            .map(|o| state.details(o, None))
            .collect();
        Ok(CatalogState::newest_first(orders))
    }

    async fn orders_for_shop(&self, shop_id: ShopId) -> Result<Vec<OrderDetails>> {
        let state = self.committed.read().await;
        let orders = state
            .orders
            .values()
            .filter(|o| o.status.is_submitted())
            .map(|o| state.details(o, Some(shop_id)))
            .filter(|details| !details.lines.is_empty())
            .collect();
        Ok(CatalogState::newest_first(orders))
    }

    async fn contacts(&self, user_id: UserId) -> Result<Vec<Contact>> {
        let state = self.committed.read().await;
        Ok(state
            .contacts
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact> {
        self.write(|state| {
            if !state.users.contains_key(&contact.user_id) {
                return Err(StoreError::MissingReference {
                    entity: "user",
                    id: contact.user_id.as_i64(),
                });
            }
            let created = Contact {
                id: ContactId::new(state.next_id()),
                user_id: contact.user_id,
                city: contact.city,
                street: contact.street,
                house: contact.house,
                structure: contact.structure,
                building: contact.building,
                apartment: contact.apartment,
                phone: contact.phone,
            };
            state.contacts.insert(created.id, created.clone());
            Ok(created)
        })
        .await
    }
}

/// Transaction over the in-memory store.
///
/// Holds the writer lock for its whole lifetime; dropping it without
/// calling [`StoreTransaction::commit`] discards the working copy.
pub struct InMemoryTransaction {
    _writer: OwnedMutexGuard<()>,
    committed: Arc<RwLock<CatalogState>>,
    working: CatalogState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_basket(&mut self, user_id: UserId) -> Result<Option<Order>> {
        Ok(self.working.basket_of(user_id).cloned())
    }

    async fn get_or_create_basket(&mut self, user_id: UserId) -> Result<Order> {
        if let Some(basket) = self.working.basket_of(user_id) {
            return Ok(basket.clone());
        }
        let basket = Order {
            id: OrderId::new(self.working.next_id()),
            user_id,
            status: OrderStatus::Basket,
            created_at: Utc::now(),
            contact_id: None,
        };
        self.working.orders.insert(basket.id, basket.clone());
        Ok(basket)
    }

    async fn order_for_update(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>> {
        Ok(self
            .working
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id)
            .cloned())
    }

    async fn stock_entry(&mut self, id: StockEntryId) -> Result<Option<StockEntry>> {
        Ok(self.working.stock_view(id))
    }

    async fn try_decrement_stock(&mut self, id: StockEntryId, quantity: u32) -> Result<bool> {
        match self.working.stock.get_mut(&id) {
            Some(entry) if entry.quantity >= quantity => {
                entry.quantity -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&mut self, id: StockEntryId, quantity: u32) -> Result<()> {
        let entry = self
            .working
            .stock
            .get_mut(&id)
            .ok_or(StoreError::MissingReference {
                entity: "stock entry",
                id: id.as_i64(),
            })?;
        entry.quantity = entry.quantity.saturating_add(quantity);
        Ok(())
    }

    async fn upsert_line_item(&mut self, order_id: OrderId, line: NewLineItem) -> Result<LineItem> {
        if !self.working.orders.contains_key(&order_id) {
            return Err(StoreError::MissingReference {
                entity: "order",
                id: order_id.as_i64(),
            });
        }
        if let Some(existing) = self
            .working
            .lines
            .values_mut()
            .find(|l| l.order_id == order_id && l.stock_entry_id == line.stock_entry_id)
        {
            existing.quantity += line.quantity;
            existing.price = line.price;
            return Ok(existing.clone());
        }
        let created = LineItem {
            id: LineItemId::new(self.working.next_id()),
            order_id,
            stock_entry_id: line.stock_entry_id,
            quantity: line.quantity,
            price: line.price,
        };
        self.working.lines.insert(created.id, created.clone());
        Ok(created)
    }

    async fn line_item(
        &mut self,
        order_id: OrderId,
        line_id: LineItemId,
    ) -> Result<Option<LineItem>> {
        Ok(self
            .working
            .lines
            .get(&line_id)
            .filter(|l| l.order_id == order_id)
            .cloned())
    }

    async fn lines_in_order(
        &mut self,
        order_id: OrderId,
        ids: &[LineItemId],
    ) -> Result<Vec<LineItem>> {
        Ok(self
            .working
            .lines
            .values()
            .filter(|l| l.order_id == order_id && ids.contains(&l.id))
            .cloned()
            .collect())
    }

    async fn count_lines(&mut self, order_id: OrderId) -> Result<u64> {
        Ok(self
            .working
            .lines
            .values()
            .filter(|l| l.order_id == order_id)
            .count() as u64)
    }

    async fn set_line_quantity(&mut self, line_id: LineItemId, quantity: u32) -> Result<()> {
        let line = self
            .working
            .lines
            .get_mut(&line_id)
            .ok_or(StoreError::MissingReference {
                entity: "line item",
                id: line_id.as_i64(),
            })?;
        line.quantity = quantity;
        Ok(())
    }

    async fn delete_line_items(&mut self, ids: &[LineItemId]) -> Result<u64> {
        let mut deleted = 0;
        for id in ids {
            if self.working.lines.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn contact(&mut self, user_id: UserId, contact_id: ContactId) -> Result<Option<Contact>> {
        Ok(self
            .working
            .contacts
            .get(&contact_id)
            .filter(|c| c.user_id == user_id)
            .cloned())
    }

    async fn transition_order(
        &mut self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        contact_id: Option<ContactId>,
    ) -> Result<bool> {
        match self.working.orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.status = to;
                if contact_id.is_some() {
                    order.contact_id = contact_id;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self) -> Result<()> {
        let mut committed = self.committed.write().await;
        *committed = self.working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    async fn store_with_entry(quantity: u32) -> (InMemoryCatalogStore, StockEntry) {
        let store = InMemoryCatalogStore::new();
        let shop = store.add_shop("Test Shop", None, true).await;
        let entry = store
            .add_stock_entry(NewStockEntry {
                shop_id: shop.id,
                product_name: "Phone".to_string(),
                model: "X-1".to_string(),
                quantity,
                price: Money::new(100),
                price_rrc: Money::new(120),
            })
            .await;
        (store, entry)
    }

    async fn quantity(store: &InMemoryCatalogStore, id: StockEntryId) -> u32 {
        store.stock_entry(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn guarded_decrement_refuses_to_go_negative() {
        let (store, entry) = store_with_entry(3).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.try_decrement_stock(entry.id, 4).await.unwrap());
        assert!(tx.try_decrement_stock(entry.id, 3).await.unwrap());
        assert!(!tx.try_decrement_stock(entry.id, 1).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(quantity(&store, entry.id).await, 0);
    }

    #[tokio::test]
    async fn guarded_decrement_of_missing_entry_updates_nothing() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(
            !tx.try_decrement_stock(StockEntryId::new(99), 1)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible_to_readers() {
        let (store, entry) = store_with_entry(10).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.try_decrement_stock(entry.id, 4).await.unwrap());
        assert_eq!(tx.stock_entry(entry.id).await.unwrap().unwrap().quantity, 6);
        assert_eq!(quantity(&store, entry.id).await, 10);

        tx.commit().await.unwrap();
        assert_eq!(quantity(&store, entry.id).await, 6);
    }

    #[tokio::test]
    async fn rollback_and_drop_discard_writes() {
        let (store, entry) = store_with_entry(10).await;
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;

        let mut tx = store.begin().await.unwrap();
        let basket = tx.get_or_create_basket(user.id).await.unwrap();
        tx.try_decrement_stock(entry.id, 5).await.unwrap();
        tx.upsert_line_item(
            basket.id,
            NewLineItem {
                stock_entry_id: entry.id,
                quantity: 5,
                price: entry.price,
            },
        )
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.increment_stock(entry.id, 7).await.unwrap();
        }

        assert_eq!(quantity(&store, entry.id).await, 10);
        assert_eq!(store.line_count().await, 0);
    }

    #[tokio::test]
    async fn one_basket_per_user() {
        let store = InMemoryCatalogStore::new();
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;

        let mut tx = store.begin().await.unwrap();
        let first = tx.get_or_create_basket(user.id).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let second = tx.get_or_create_basket(user.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, OrderStatus::Basket);
    }

    #[tokio::test]
    async fn upsert_merges_lines_for_the_same_entry() {
        let (store, entry) = store_with_entry(10).await;
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;

        let mut tx = store.begin().await.unwrap();
        let basket = tx.get_or_create_basket(user.id).await.unwrap();
        let line = NewLineItem {
            stock_entry_id: entry.id,
            quantity: 2,
            price: entry.price,
        };
        let first = tx.upsert_line_item(basket.id, line).await.unwrap();
        let merged = tx.upsert_line_item(basket.id, line).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, merged.id);
        assert_eq!(merged.quantity, 4);
        assert_eq!(store.line_count().await, 1);
    }

    #[tokio::test]
    async fn transition_is_guarded_by_current_status() {
        let store = InMemoryCatalogStore::new();
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;

        let mut tx = store.begin().await.unwrap();
        let basket = tx.get_or_create_basket(user.id).await.unwrap();
        assert!(
            tx.transition_order(basket.id, OrderStatus::Basket, OrderStatus::New, None)
                .await
                .unwrap()
        );
        assert!(
            !tx.transition_order(basket.id, OrderStatus::Basket, OrderStatus::New, None)
                .await
                .unwrap()
        );
        assert!(tx.find_basket(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn closed_shops_are_hidden_from_listing() {
        let store = InMemoryCatalogStore::new();
        let owner = store.add_user("shop@example.com", UserKind::Shop).await;
        let shop = store.add_shop("Closed", Some(owner.id), false).await;
        let entry = store
            .add_stock_entry(NewStockEntry {
                shop_id: shop.id,
                product_name: "Phone".to_string(),
                model: "X-1".to_string(),
                quantity: 1,
                price: Money::new(100),
                price_rrc: Money::new(120),
            })
            .await;

        assert!(store.list_stock_entries(None).await.unwrap().is_empty());
        assert!(!entry.shop_accepts_orders);

        store.set_shop_accepts_orders(owner.id, true).await.unwrap();
        let listed = store.list_stock_entries(Some(shop.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].shop_accepts_orders);
    }

    #[tokio::test]
    async fn tokens_resolve_to_users() {
        let store = InMemoryCatalogStore::new();
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;
        store.add_token(user.id, "secret").await;

        assert_eq!(store.user_by_token("secret").await.unwrap(), Some(user));
        assert_eq!(store.user_by_token("other").await.unwrap(), None);
    }
}
