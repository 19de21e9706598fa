//! Endpoints for shop accounts.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use catalog_store::CatalogStore;
use domain::parse_flag;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::payload::{
    self, FlagField, OrderResponse, PartnerStateRequest, ShopResponse, StatusResponse,
};
use crate::state::AppState;

/// Reads `state` as a bool, a flag string such as `"on"`, or `0`/`1`.
fn requested_state(req: &PartnerStateRequest) -> Result<bool, ApiError> {
    let accepts = match &req.state {
        Some(FlagField::Bool(flag)) => Some(*flag),
        Some(FlagField::Text(raw)) => parse_flag(raw),
        Some(FlagField::Number(0)) => Some(false),
        Some(FlagField::Number(1)) => Some(true),
        _ => None,
    };
    accepts.ok_or_else(|| ApiError::bad_request("state must be true or false"))
}

/// GET /partner/orders — submitted orders holding this shop's stock.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn orders<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.partners.orders(&user).await?;
    Ok(Json(payload::orders_response(&orders)))
}

/// GET /partner/state — whether the shop accepts orders.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_state<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<Json<ShopResponse>, ApiError> {
    let shop = state.partners.state(&user).await?;
    Ok(Json(ShopResponse::from(shop)))
}

/// POST /partner/state — opens or closes the shop.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn set_state<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    req: Result<Json<PartnerStateRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = req?;
    let accepts = requested_state(&req)?;
    state.partners.set_state(&user, accepts).await?;
    Ok(Json(StatusResponse::ok()))
}
