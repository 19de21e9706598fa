//! Basket aggregate operations: reserve, rebalance and release stock.

mod commands;
mod service;

pub use commands::{AddItems, AddLine, RemoveItems, UpdateItems, UpdateLine};
pub use service::BasketService;
