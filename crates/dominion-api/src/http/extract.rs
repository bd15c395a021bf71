//! Extractor for the authenticated caller.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderName, StatusCode},
    Json,
};

use dominion_domain::Principal;
use dominion_storage::DataStore;

use super::routes::ApiError;
use super::state::AppState;

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Any handler taking this extractor rejects unauthenticated requests with
/// 401 before the handler body runs. Resolution is pure token validation;
/// it performs no database lookup.
pub struct CurrentUser(pub Principal);

/// Rejection for missing, malformed, or expired bearer tokens.
///
/// Carries the `WWW-Authenticate: Bearer` challenge header alongside the
/// error body.
pub type AuthRejection = (
    StatusCode,
    [(HeaderName, &'static str); 1],
    Json<ApiError>,
);

fn unauthenticated() -> AuthRejection {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(ApiError::unauthenticated("Could not validate credentials")),
    )
}

/// Pulls the token out of an `Authorization` header with a case-insensitive
/// `Bearer` scheme.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[async_trait]
impl<S: DataStore> FromRequestParts<Arc<AppState<S>>> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(unauthenticated)?;

        let principal = state
            .sessions
            .resolve_caller(token)
            .map_err(|_| unauthenticated())?;

        Ok(CurrentUser(principal))
    }
}
