//! Access token authentication.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use catalog_store::{CatalogStore, User};
use domain::DomainError;

use crate::error::ApiError;
use crate::state::AppState;

/// The user behind the request's access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// Extracts the token from `Authorization: Bearer <token>` or `Token <token>`.
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    let known_scheme = scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    (known_scheme && !token.is_empty()).then_some(token)
}

impl<S: CatalogStore + 'static> FromRequestParts<Arc<AppState<S>>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token(&parts.headers).ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided".to_string())
        })?;

        let user = state
            .store
            .user_by_token(token)
            .await
            .map_err(DomainError::from)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;

        tracing::debug!(user_id = %user.id, "request authenticated");
        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_bearer_and_token_schemes() {
        assert_eq!(access_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(access_token(&headers("Token abc")), Some("abc"));
        assert_eq!(access_token(&headers("bearer  abc ")), Some("abc"));
    }

    #[test]
    fn rejects_other_forms() {
        assert_eq!(access_token(&headers("Basic abc")), None);
        assert_eq!(access_token(&headers("Bearer")), None);
        assert_eq!(access_token(&headers("Bearer ")), None);
        assert_eq!(access_token(&HeaderMap::new()), None);
    }
}
