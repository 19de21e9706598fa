//! Order history and checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use catalog_store::{CatalogStore, ContactId, OrderId};
use domain::Checkout;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::payload::{self, CheckoutRequest, OrderResponse, StatusResponse};
use crate::state::AppState;

fn checkout_ids(req: &CheckoutRequest) -> Result<(OrderId, ContactId), ApiError> {
    let order_id = req.id.as_ref().and_then(|id| id.positive());
    let contact_id = req.contact.as_ref().and_then(|id| id.positive());

    match (order_id, contact_id) {
        (Some(order_id), Some(contact_id)) => {
            Ok((OrderId::new(order_id), ContactId::new(contact_id)))
        }
        (order_id, contact_id) => {
            let mut errors = Vec::new();
            if order_id.is_none() {
                errors.push("id must be a positive integer".to_string());
            }
            if contact_id.is_none() {
                errors.push("contact must be a positive integer".to_string());
            }
            Err(ApiError::BadRequest(errors))
        }
    }
}

/// GET /order — the caller's submitted orders, newest first.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_orders(user.id).await?;
    Ok(Json(payload::orders_response(&orders)))
}

/// POST /order — check out the basket `id` to the delivery contact `contact`.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn checkout<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    req: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = req?;
    let (order_id, contact_id) = checkout_ids(&req)?;

    state
        .orders
        .checkout(Checkout::new(user.id, order_id, contact_id))
        .await?;
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn request(body: Value) -> CheckoutRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_numbers_and_digit_strings() {
        let (order, contact) = checkout_ids(&request(json!({ "id": "4", "contact": 9 }))).unwrap();
        assert_eq!(order, OrderId::new(4));
        assert_eq!(contact, ContactId::new(9));
    }

    #[test]
    fn reports_each_missing_field() {
        match checkout_ids(&request(json!({ "id": 0, "contact": "x" }))) {
            Err(ApiError::BadRequest(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected bad request, got {other:?}"),
        }
    }
}
