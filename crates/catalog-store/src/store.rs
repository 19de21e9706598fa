use async_trait::async_trait;

use crate::{
    Contact, ContactId, LineItem, LineItemId, NewContact, NewLineItem, Order, OrderDetails,
    OrderId, OrderScope, OrderStatus, Result, Shop, ShopId, StockEntry, StockEntryId, User, UserId,
};

/// Core trait for catalog store implementations.
///
/// Methods on the store itself are committed reads (and a few single-row
/// writes that need no coordination). Everything that touches the stock
/// ledger and basket lines together goes through a [`StoreTransaction`]
/// obtained from [`CatalogStore::begin`].
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// The transaction type handed out by [`CatalogStore::begin`].
    type Tx: StoreTransaction + 'static;

    /// Opens a transaction.
    ///
    /// Dropping the transaction without committing rolls it back.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Checks that the backing storage is reachable.
    async fn ping(&self) -> Result<()>;

    /// Looks up a stock entry by id.
    async fn stock_entry(&self, id: StockEntryId) -> Result<Option<StockEntry>>;

    /// Lists stock entries of shops that accept orders, optionally for one shop.
    async fn list_stock_entries(&self, shop_id: Option<ShopId>) -> Result<Vec<StockEntry>>;

    /// Resolves an access token to its user.
    async fn user_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Returns the shop owned by a user.
    async fn shop_by_owner(&self, owner_id: UserId) -> Result<Option<Shop>>;

    /// Toggles whether a shop accepts orders. Returns the updated shop.
    async fn set_shop_accepts_orders(&self, owner_id: UserId, accepts: bool)
    -> Result<Option<Shop>>;

    /// Returns a user's orders in the given scope, with their lines.
    ///
    /// Orders are returned newest first.
    async fn orders_for_user(&self, user_id: UserId, scope: OrderScope)
    -> Result<Vec<OrderDetails>>;

    /// Returns submitted orders holding lines of the given shop.
    ///
    /// Only that shop's lines are included in each order.
    async fn orders_for_shop(&self, shop_id: ShopId) -> Result<Vec<OrderDetails>>;

    /// Returns a user's contacts.
    async fn contacts(&self, user_id: UserId) -> Result<Vec<Contact>>;

    /// Creates a contact.
    async fn create_contact(&self, contact: NewContact) -> Result<Contact>;
}

/// A unit of work over the stock ledger and orders.
///
/// All writes become visible to other readers at [`StoreTransaction::commit`]
/// or not at all.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Returns the user's basket, if one exists.
    async fn find_basket(&mut self, user_id: UserId) -> Result<Option<Order>>;

    /// Returns the user's basket, creating it if needed.
    ///
    /// At most one basket exists per user, also under concurrent callers.
    async fn get_or_create_basket(&mut self, user_id: UserId) -> Result<Order>;

    /// Returns an order owned by the user, locked for the rest of the transaction.
    async fn order_for_update(&mut self, user_id: UserId, order_id: OrderId)
    -> Result<Option<Order>>;

    /// Reads a stock entry, including this transaction's own writes.
    async fn stock_entry(&mut self, id: StockEntryId) -> Result<Option<StockEntry>>;

    /// Guarded decrement: subtracts `quantity` only if at least that much is
    /// available at write time.
    ///
    /// Returns false if nothing was updated (entry missing or not enough left).
    async fn try_decrement_stock(&mut self, id: StockEntryId, quantity: u32) -> Result<bool>;

    /// Returns `quantity` to a stock entry.
    async fn increment_stock(&mut self, id: StockEntryId, quantity: u32) -> Result<()>;

    /// Inserts a line, or adds to the quantity of the order's existing line
    /// for the same stock entry.
    async fn upsert_line_item(&mut self, order_id: OrderId, line: NewLineItem) -> Result<LineItem>;

    /// Returns one line of an order, locked for the rest of the transaction.
    async fn line_item(&mut self, order_id: OrderId, line_id: LineItemId)
    -> Result<Option<LineItem>>;

    /// Returns the lines of an order among `ids`, locked for the rest of the
    /// transaction. Unknown ids are skipped.
    async fn lines_in_order(&mut self, order_id: OrderId, ids: &[LineItemId])
    -> Result<Vec<LineItem>>;

    /// Counts the lines of an order.
    async fn count_lines(&mut self, order_id: OrderId) -> Result<u64>;

    /// Overwrites the reserved quantity of a line.
    async fn set_line_quantity(&mut self, line_id: LineItemId, quantity: u32) -> Result<()>;

    /// Deletes lines. Returns the number of rows removed.
    async fn delete_line_items(&mut self, ids: &[LineItemId]) -> Result<u64>;

    /// Returns a contact owned by the user.
    async fn contact(&mut self, user_id: UserId, contact_id: ContactId) -> Result<Option<Contact>>;

    /// Guarded status change: moves the order from `from` to `to` only if it
    /// is still in `from`, attaching `contact_id` when given.
    ///
    /// Returns false if the order was not in `from`.
    async fn transition_order(
        &mut self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        contact_id: Option<ContactId>,
    ) -> Result<bool>;

    /// Makes every write of this transaction visible.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this transaction.
    async fn rollback(self) -> Result<()>;
}
