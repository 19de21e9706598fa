//! Rows held by the catalog store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContactId, LineItemId, Money, OrderId, OrderStatus, ShopId, StockEntryId, UserId};

/// Kind of account behind an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    #[default]
    Buyer,
    Shop,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Buyer => "buyer",
            UserKind::Shop => "shop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub kind: UserKind,
}

/// A partner shop. Stock of a shop that does not accept orders cannot be
/// reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub owner_id: Option<UserId>,
    pub accepts_orders: bool,
}

/// Available quantity and price of one product variant at one shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub id: StockEntryId,
    pub shop_id: ShopId,
    pub product_name: String,
    pub model: String,
    /// Quantity not reserved by any basket. Never negative.
    pub quantity: u32,
    pub price: Money,
    /// Recommended retail price.
    pub price_rrc: Money,
    /// Whether the owning shop currently accepts orders.
    pub shop_accepts_orders: bool,
}

/// Input for seeding a stock entry (the partner import path).
#[derive(Debug, Clone)]
pub struct NewStockEntry {
    pub shop_id: ShopId,
    pub product_name: String,
    pub model: String,
    pub quantity: u32,
    pub price: Money,
    pub price_rrc: Money,
}

/// An order header; the user's basket is an order in `basket` status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub contact_id: Option<ContactId>,
}

/// A reserved quantity of one stock entry inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub stock_entry_id: StockEntryId,
    pub quantity: u32,
    /// Unit price at the time of reservation.
    pub price: Money,
}

impl LineItem {
    pub fn total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// Input for creating (or merging into) a basket line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewLineItem {
    pub stock_entry_id: StockEntryId,
    pub quantity: u32,
    pub price: Money,
}

/// A line joined with the stock entry it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDetails {
    pub line: LineItem,
    pub stock: StockEntry,
}

/// An order with its lines, as returned by read queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<LineDetails>,
}

impl OrderDetails {
    /// Sum of quantity times price snapshot over all lines.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.line.total()).sum()
    }
}

/// Which of a user's orders a read query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Only the order in `basket` status.
    Basket,
    /// Every order that has left the basket.
    Submitted,
}

impl OrderScope {
    pub fn includes(&self, status: OrderStatus) -> bool {
        match self {
            OrderScope::Basket => status == OrderStatus::Basket,
            OrderScope::Submitted => status.is_submitted(),
        }
    }
}

/// Delivery contact of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub user_id: UserId,
    pub city: String,
    pub street: String,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub user_id: UserId,
    pub city: String,
    pub street: String,
    pub house: Option<String>,
    pub structure: Option<String>,
    pub building: Option<String>,
    pub apartment: Option<String>,
    pub phone: String,
}
