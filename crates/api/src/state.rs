//! Shared application state.

use std::sync::Arc;

use catalog_store::CatalogStore;
use domain::{BasketService, ContactService, EventPublisher, OrderService, PartnerService};

/// Shared application state accessible from all handlers.
pub struct AppState<S: CatalogStore> {
    pub store: S,
    pub basket: BasketService<S>,
    pub orders: OrderService<S>,
    pub contacts: ContactService<S>,
    pub partners: PartnerService<S>,
}

impl<S: CatalogStore + Clone> AppState<S> {
    /// Wires every service to the same store; checkout events go to `publisher`.
    pub fn new(store: S, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            basket: BasketService::new(store.clone()),
            orders: OrderService::new(store.clone(), publisher),
            contacts: ContactService::new(store.clone()),
            partners: PartnerService::new(store.clone()),
            store,
        }
    }
}
