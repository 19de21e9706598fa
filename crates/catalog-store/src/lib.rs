pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{ContactId, LineItemId, Money, OrderId, OrderStatus, ShopId, StockEntryId, UserId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryCatalogStore, InMemoryTransaction};
pub use model::{
    Contact, LineDetails, LineItem, NewContact, NewLineItem, NewStockEntry, Order, OrderDetails,
    OrderScope, Shop, StockEntry, User, UserKind,
};
pub use postgres::{PostgresCatalogStore, PostgresTransaction};
pub use store::{CatalogStore, StoreTransaction};
