//! Bearer token authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{DomainError, UserId};

use super::error::ApiError;
use super::AppState;

/// The authenticated caller. Rejects the request with 401 when the
/// `Authorization` header is missing or its token does not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::MissingCredentials)?;
        let header = header
            .to_str()
            .map_err(|_| DomainError::Unauthorized("non-ascii authorization header".into()))?;

        let token = bearer_token(header)?;
        let user_id = state.accounts.authenticate(token).await?;
        Ok(CurrentUser(user_id))
    }
}

/// Accepts `Bearer <token>` and `Token <token>`. Any other scheme counts
/// as no credentials at all.
fn bearer_token(header: &str) -> Result<&str, ApiError> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next().ok_or(ApiError::MissingCredentials)?;
    if !scheme.eq_ignore_ascii_case("bearer") && !scheme.eq_ignore_ascii_case("token") {
        return Err(ApiError::MissingCredentials);
    }
    match (parts.next(), parts.next()) {
        (Some(token), None) => Ok(token),
        _ => Err(DomainError::Unauthorized("malformed authorization header".into()).into()),
    }
}
