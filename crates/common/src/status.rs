//! Order status machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Basket ──► New ──► Confirmed ──► Assembled ──► Sent ──► Delivered
///   │         │          │             │          │
///   └─────────┴──────────┴─────────────┴──────────┴──► Canceled
/// ```
///
/// `Basket → New` is checkout. The shop-driven progression after `New` only
/// moves forward, but may skip steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Mutable cart, line items hold reservations.
    #[default]
    Basket,

    /// Submitted by the buyer, awaiting the shop.
    New,

    /// Confirmed by the shop.
    Confirmed,

    /// Assembled for shipping.
    Assembled,

    /// Handed to delivery.
    Sent,

    /// Delivered (terminal state).
    Delivered,

    /// Canceled (terminal state).
    Canceled,
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Basket,
        OrderStatus::New,
        OrderStatus::Confirmed,
        OrderStatus::Assembled,
        OrderStatus::Sent,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    /// Returns true if line items can be added, changed or removed.
    pub fn can_modify_items(&self) -> bool {
        matches!(self, OrderStatus::Basket)
    }

    /// Returns true if the order has left the basket.
    pub fn is_submitted(&self) -> bool {
        !matches!(self, OrderStatus::Basket)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    /// Returns true if moving from `self` to `target` is allowed.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self, target) {
            (_, OrderStatus::Canceled) => true,
            (OrderStatus::Basket, OrderStatus::New) => true,
            (OrderStatus::Basket, _) | (_, OrderStatus::Basket) => false,
            (from, to) => from.progress_rank() < to.progress_rank(),
        }
    }

    fn progress_rank(&self) -> u8 {
        match self {
            OrderStatus::Basket => 0,
            OrderStatus::New => 1,
            OrderStatus::Confirmed => 2,
            OrderStatus::Assembled => 3,
            OrderStatus::Sent => 4,
            OrderStatus::Delivered => 5,
            OrderStatus::Canceled => 6,
        }
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Basket => "basket",
            OrderStatus::New => "new",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Assembled => "assembled",
            OrderStatus::Sent => "sent",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_basket() {
        assert_eq!(OrderStatus::default(), OrderStatus::Basket);
    }

    #[test]
    fn test_only_basket_can_modify_items() {
        assert!(OrderStatus::Basket.can_modify_items());
        for status in &OrderStatus::ALL[1..] {
            assert!(!status.can_modify_items(), "{status} must be immutable");
        }
    }

    #[test]
    fn test_checkout_transition() {
        assert!(OrderStatus::Basket.can_transition_to(OrderStatus::New));
        assert!(!OrderStatus::Basket.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::New.can_transition_to(OrderStatus::Basket));
    }

    #[test]
    fn test_shop_progression_moves_forward_only() {
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Confirmed));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Assembled));
        assert!(OrderStatus::Assembled.can_transition_to(OrderStatus::Sent));
        assert!(OrderStatus::Sent.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::New.can_transition_to(OrderStatus::Sent));
        assert!(!OrderStatus::Sent.can_transition_to(OrderStatus::Confirmed));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Confirmed));
    }

    #[test]
    fn test_cancel_from_non_terminal_states() {
        for status in [
            OrderStatus::Basket,
            OrderStatus::New,
            OrderStatus::Confirmed,
            OrderStatus::Assembled,
            OrderStatus::Sent,
        ] {
            assert!(status.can_transition_to(OrderStatus::Canceled));
        }
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Canceled.can_transition_to(OrderStatus::Canceled));
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::Sent.is_terminal());
        assert!(!OrderStatus::Basket.is_terminal());
    }

    #[test]
    fn test_parse_round_trips_every_status() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!(
            "shipped".parse::<OrderStatus>(),
            Err(UnknownStatus("shipped".to_string()))
        );
    }

    #[test]
    fn test_serialization_uses_lowercase_names() {
        let json = serde_json::to_string(&OrderStatus::Assembled).unwrap();
        assert_eq!(json, "\"assembled\"");
    }
}
