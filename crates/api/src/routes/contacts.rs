//! Delivery contact endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use catalog_store::{CatalogStore, NewContact, UserId};
use serde_json::{Value, json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::routes::payload::{ContactRequest, ContactResponse};
use crate::state::AppState;

/// Trims a text field; blank reads as missing.
fn text(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn new_contact(user_id: UserId, req: ContactRequest) -> NewContact {
    NewContact {
        user_id,
        city: text(req.city).unwrap_or_default(),
        street: text(req.street).unwrap_or_default(),
        house: text(req.house),
        structure: text(req.structure),
        building: text(req.building),
        apartment: text(req.apartment),
        phone: text(req.phone).unwrap_or_default(),
    }
}

/// GET /contact — the caller's delivery contacts.
#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let contacts = state.contacts.list(user.id).await?;
    Ok(Json(contacts.into_iter().map(ContactResponse::from).collect()))
}

/// POST /contact — adds a delivery contact; city, street and phone are required.
#[tracing::instrument(skip(state, user, req), fields(user_id = %user.id))]
pub async fn create<S: CatalogStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user): AuthUser,
    req: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(req) = req?;
    let contact = state.contacts.create(new_contact(user.id, req)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "Status": true, "id": contact.id.as_i64() })),
    ))
}
