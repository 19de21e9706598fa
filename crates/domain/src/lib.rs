//! Domain layer for the basket service.
//!
//! This crate provides:
//! - The reservation protocol moving stock between the ledger and baskets
//! - Checkout and order history
//! - Delivery contacts
//! - Partner shop operations

pub mod basket;
pub mod contact;
pub mod error;
pub mod order;
pub mod partner;

pub use basket::{AddItems, AddLine, BasketService, RemoveItems, UpdateItems, UpdateLine};
pub use contact::{ContactService, validate_contact};
pub use error::{DomainError, ErrorKind, ReservationError};
pub use order::{
    Checkout, EventPublisher, OrderError, OrderEvent, OrderService, OrderStatusChangedData,
    PublishError,
};
pub use partner::{PartnerService, parse_flag};
