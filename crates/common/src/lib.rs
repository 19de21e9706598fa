//! Shared types used across the basket service crates.

pub mod money;
pub mod status;
pub mod types;

pub use money::Money;
pub use status::{OrderStatus, UnknownStatus};
pub use types::{ContactId, LineItemId, OrderId, ShopId, StockEntryId, UserId};
