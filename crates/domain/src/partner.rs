//! Operations available to shop accounts.

use catalog_store::{CatalogStore, OrderDetails, Shop, User, UserKind};

use crate::error::DomainError;

/// Parses a loose on/off flag: `true/false`, `on/off`, `yes/no`, `1/0`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Service for partner shops: incoming orders and the order intake switch.
pub struct PartnerService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> PartnerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn shop_of(&self, user: &User) -> Result<Shop, DomainError> {
        if user.kind != UserKind::Shop {
            return Err(DomainError::NotAPartner);
        }
        self.store
            .shop_by_owner(user.id)
            .await?
            .ok_or(DomainError::ShopNotFound)
    }

    /// Submitted orders that contain this shop's stock.
    ///
    /// Each order lists only the shop's own lines, so its total covers only
    /// what the shop has to fulfill.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn orders(&self, user: &User) -> Result<Vec<OrderDetails>, DomainError> {
        let shop = self.shop_of(user).await?;
        Ok(self.store.orders_for_shop(shop.id).await?)
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn state(&self, user: &User) -> Result<Shop, DomainError> {
        self.shop_of(user).await
    }

    /// Opens or closes the shop for new reservations.
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn set_state(&self, user: &User, accepts_orders: bool) -> Result<Shop, DomainError> {
        self.shop_of(user).await?;
        let shop = self
            .store
            .set_shop_accepts_orders(user.id, accepts_orders)
            .await?
            .ok_or(DomainError::ShopNotFound)?;
        tracing::info!(shop_id = %shop.id, accepts_orders, "shop order intake changed");
        Ok(shop)
    }
}
