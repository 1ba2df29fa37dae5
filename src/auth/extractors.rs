//! Authentication gate for protected routes

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::token::TokenService;
use crate::common::{ApiError, AppState};

/// Account identity attached to a request that passed the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthedAccount {
    pub account_id: i64,
}

/// Returns the token from `Authorization: Bearer <token>`.
///
/// Exactly two whitespace-separated parts, scheme matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let (scheme, token) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token)
}

/// Every failure maps to the same `401` so callers can't tell which check failed.
pub fn authenticate(headers: &HeaderMap, tokens: &TokenService) -> Result<AuthedAccount, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| {
        warn!("Authentication failed: missing or malformed Authorization header");
        ApiError::unauthenticated()
    })?;

    let account_id = tokens.verify(token).map_err(|e| {
        warn!(error = %e, "Authentication failed: token rejected");
        ApiError::unauthenticated()
    })?;

    debug!(account_id = account_id, "Request authenticated");
    Ok(AuthedAccount { account_id })
}

/// Middleware for protected routers: verifies the bearer token and stores
/// [`AuthedAccount`] in the request extensions for downstream handlers.
pub async fn require_auth(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authed = authenticate(request.headers(), &state.tokens)?;
    request.extensions_mut().insert(authed);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedAccount
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already verified by `require_auth`
        if let Some(authed) = parts.extensions.get::<AuthedAccount>() {
            return Ok(*authed);
        }

        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        authenticate(&parts.headers, &app_state.tokens)
    }
}
