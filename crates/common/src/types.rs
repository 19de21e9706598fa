use serde::{Deserialize, Serialize};

/// Declares a typed wrapper around a database-assigned integer key.
macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

integer_id!(
    /// Authenticated user (buyer or shop owner).
    UserId
);
integer_id!(
    /// Partner shop.
    ShopId
);
integer_id!(
    /// Per-shop, per-variant stock record.
    StockEntryId
);
integer_id!(
    /// Order, including the user's basket.
    OrderId
);
integer_id!(
    /// Line inside an order.
    LineItemId
);
integer_id!(
    /// Delivery contact owned by a user.
    ContactId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_preserves_raw_value() {
        let id = StockEntryId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
        assert_eq!(StockEntryId::from(42), id);
    }

    #[test]
    fn id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&LineItemId::new(7)).unwrap();
        assert_eq!(json, "7");

        let id: LineItemId = serde_json::from_str("7").unwrap();
        assert_eq!(id, LineItemId::new(7));
    }

    #[test]
    fn id_display() {
        assert_eq!(OrderId::new(15).to_string(), "15");
    }
}
