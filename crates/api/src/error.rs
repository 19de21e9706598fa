//! API error types with HTTP response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use serde_json::{Value, json};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unknown access token.
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated, but not allowed.
    #[error("{0}")]
    Forbidden(String),
    /// Malformed request, one message per problem.
    #[error("bad request: {}", .0.join("; "))]
    BadRequest(Vec<String>),
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Domain logic error.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(vec![message.into()])
    }
}

/// Undecodable JSON bodies are ordinary bad requests.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

fn failure(status: StatusCode, errors: Vec<String>) -> (StatusCode, Value) {
    (status, json!({ "Status": false, "Errors": errors }))
}

fn denial(status: StatusCode, message: String) -> (StatusCode, Value) {
    (status, json!({ "Status": false, "Error": message }))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => denial(StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => denial(StatusCode::FORBIDDEN, msg),
            ApiError::BadRequest(errors) => failure(StatusCode::BAD_REQUEST, errors),
            ApiError::NotFound(msg) => failure(StatusCode::NOT_FOUND, vec![msg]),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                failure(StatusCode::INTERNAL_SERVER_ERROR, vec![msg])
            }
        };

        (status, Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, Value) {
    match err {
        DomainError::Rejected(errors) => failure(
            StatusCode::BAD_REQUEST,
            errors.iter().map(ToString::to_string).collect(),
        ),
        DomainError::BasketNotFound | DomainError::NothingMatched | DomainError::ShopNotFound => {
            failure(StatusCode::NOT_FOUND, vec![err.to_string()])
        }
        DomainError::NotAPartner => denial(StatusCode::FORBIDDEN, err.to_string()),
        DomainError::Order(ref order_err) => {
            let status = match order_err {
                OrderError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                OrderError::ContactNotFound(_) | OrderError::EmptyBasket(_) => {
                    StatusCode::BAD_REQUEST
                }
                OrderError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            };
            failure(status, vec![order_err.to_string()])
        }
        DomainError::Store(store_err) => {
            tracing::error!(error = %store_err, "store failure");
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                vec!["internal server error".to_string()],
            )
        }
    }
}
