//! Demo data for running the server without a database.

use catalog_store::{InMemoryCatalogStore, Money, NewStockEntry, UserKind};

pub const BUYER_TOKEN: &str = "demo-buyer-token";
pub const SHOP_TOKEN: &str = "demo-shop-token";

/// Seeds a buyer, a shop owner with an open shop, and a few stock entries.
pub async fn seed(store: &InMemoryCatalogStore) {
    let buyer = store.add_user("buyer@example.com", UserKind::Buyer).await;
    store.add_token(buyer.id, BUYER_TOKEN).await;

    let owner = store.add_user("shop@example.com", UserKind::Shop).await;
    store.add_token(owner.id, SHOP_TOKEN).await;
    let shop = store.add_shop("Demo Electronics", Some(owner.id), true).await;

    let catalog = [
        ("Smartphone", "X-100", 10, 29_990, 31_990),
        ("Headphones", "H-20", 25, 4_990, 5_490),
        ("Charger", "C-5", 3, 1_290, 1_490),
    ];
    for (product_name, model, quantity, price, price_rrc) in catalog {
        store
            .add_stock_entry(NewStockEntry {
                shop_id: shop.id,
                product_name: product_name.to_string(),
                model: model.to_string(),
                quantity,
                price: Money::new(price),
                price_rrc: Money::new(price_rrc),
            })
            .await;
    }

    tracing::info!(
        buyer_token = BUYER_TOKEN,
        shop_token = SHOP_TOKEN,
        shop_id = %shop.id,
        "seeded in-memory catalog"
    );
}
