//! Domain error types.

use catalog_store::{LineItemId, StockEntryId, StoreError};
use thiserror::Error;

use crate::order::OrderError;

/// Why a single basket item could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// The stock entry does not exist or its shop does not accept orders.
    #[error("stock entry {0} not found")]
    StockEntryNotFound(StockEntryId),

    /// The line item is not part of the caller's basket.
    #[error("line item {0} not found in basket")]
    LineItemNotFound(LineItemId),

    /// Not enough stock left to satisfy the request.
    #[error(
        "not enough \"{product}\" in stock entry {stock_entry_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        stock_entry_id: StockEntryId,
        product: String,
        available: u32,
        requested: u32,
    },

    /// The guarded decrement lost a race with another reservation.
    #[error("stock entry {0} was modified concurrently, retry the request")]
    ConcurrentModification(StockEntryId),

    /// Malformed request content.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification of a [`ReservationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InsufficientStock,
    ConcurrentModification,
    InvalidInput,
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::StockEntryNotFound(_) | ReservationError::LineItemNotFound(_) => {
                ErrorKind::NotFound
            }
            ReservationError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ReservationError::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            ReservationError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request was rejected; nothing was committed.
    #[error("request rejected with {} error(s)", .0.len())]
    Rejected(Vec<ReservationError>),

    /// The caller has no basket.
    #[error("basket not found")]
    BasketNotFound,

    /// None of the requested line items are in the caller's basket.
    #[error("no matching line items found in basket")]
    NothingMatched,

    /// An error occurred in the order lifecycle.
    #[error("Order error: {0}")]
    Order(OrderError),

    /// The caller is not a shop account.
    #[error("only shop accounts may use partner operations")]
    NotAPartner,

    /// The shop account owns no shop.
    #[error("shop not found")]
    ShopNotFound,

    /// An error occurred in the catalog store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Returns the per-item errors of a rejected request.
    pub fn reasons(&self) -> &[ReservationError] {
        match self {
            DomainError::Rejected(errors) => errors,
            _ => &[],
        }
    }
}

impl From<ReservationError> for DomainError {
    fn from(e: ReservationError) -> Self {
        DomainError::Rejected(vec![e])
    }
}

impl From<OrderError> for DomainError {
    fn from(e: OrderError) -> Self {
        DomainError::Order(e)
    }
}
