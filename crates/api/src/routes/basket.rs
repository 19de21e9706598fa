//! Basket endpoints: list, reserve, change and release line items.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use catalog_store::{CatalogStore, LineItemId, StockEntryId};
use domain::{AddItems, AddLine, DomainError, RemoveItems, UpdateItems, UpdateLine};
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::payload::{
    self, AddItemRequest, ItemsRequest, OrderResponse, RemoveItemsRequest, UpdateItemRequest,
};
use crate::state::AppState;

impl From<AddItemRequest> for AddLine {
    fn from(item: AddItemRequest) -> Self {
        AddLine {
            stock_entry_id: StockEntryId::new(item.product_info),
            quantity: item.quantity,
        }
    }
}

impl From<UpdateItemRequest> for UpdateLine {
    fn from(item: UpdateItemRequest) -> Self {
        UpdateLine {
            line_item_id: LineItemId::new(item.id),
            quantity: item.quantity,
        }
    }
}

/// GET /basket — the caller's basket with line items and total.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let baskets = state.basket.get_basket(user.id).await?;
    Ok(Json(payload::orders_response(&baskets)))
}

/// POST /basket — reserve stock for `items: [{product_info, quantity}]`.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn add<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    req: Result<Json<ItemsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = req?;
    let lines = req
        .decode_items::<AddItemRequest>()?
        .into_iter()
        .map(AddLine::from)
        .collect();

    let created = state.basket.add_items(AddItems::new(user.id, lines)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "Status": true, "Создано объектов": created })),
    ))
}

/// PUT /basket — set quantities for `items: [{id, quantity}]`.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn update<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    req: Result<Json<ItemsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = req?;
    let lines = req
        .decode_items::<UpdateItemRequest>()?
        .into_iter()
        .map(UpdateLine::from)
        .collect();

    let updated = state
        .basket
        .update_items(UpdateItems::new(user.id, lines))
        .await?;
    Ok(Json(json!({ "Status": true, "Обновлено объектов": updated })))
}

/// DELETE /basket — release and delete the lines listed in `items`.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn remove<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    req: Result<Json<RemoveItemsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = req?;
    let ids = req
        .items
        .ok_or_else(|| ApiError::bad_request("items are required"))?;
    let cmd = RemoveItems::parse(user.id, &ids.joined()).map_err(DomainError::from)?;

    let deleted = state.basket.remove_items(cmd).await?;
    Ok(Json(json!({ "Status": true, "Удалено объектов": deleted })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_maps_onto_the_command_line() {
        let line = AddLine::from(AddItemRequest {
            product_info: 3,
            quantity: 2,
        });
        assert_eq!(line.stock_entry_id, StockEntryId::new(3));
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn update_accepts_zero_quantity() {
        let req: ItemsRequest =
            serde_json::from_value(json!({ "items": [{ "id": 7, "quantity": 0 }] })).unwrap();
        let lines: Vec<UpdateLine> = req
            .decode_items::<UpdateItemRequest>()
            .unwrap()
            .into_iter()
            .map(UpdateLine::from)
            .collect();
        assert_eq!(
            lines,
            vec![UpdateLine {
                line_item_id: LineItemId::new(7),
                quantity: 0,
            }]
        );
    }

    #[test]
    fn update_rejects_string_ids() {
        let req: ItemsRequest =
            serde_json::from_value(json!({ "items": [{ "id": "7", "quantity": 1 }] })).unwrap();
        assert!(req.decode_items::<UpdateItemRequest>().is_err());
    }
}
