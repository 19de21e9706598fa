//! Public catalog listing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use catalog_store::{CatalogStore, ShopId};
use domain::DomainError;
use serde::Deserialize;

use crate::error::ApiError;
use crate::routes::payload::ProductInfoResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub shop_id: Option<i64>,
}

/// GET /products — stock entries of shops that accept orders.
#[tracing::instrument(skip(state))]
pub async fn list<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<ProductInfoResponse>>, ApiError> {
    let entries = state
        .store
        .list_stock_entries(query.shop_id.map(ShopId::new))
        .await
        .map_err(DomainError::from)?;
    Ok(Json(entries.iter().map(ProductInfoResponse::from).collect()))
}
