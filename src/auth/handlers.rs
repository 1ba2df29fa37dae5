//! Authentication handlers

use axum::{
    extract::{Extension, Json, Query},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
};
use std::sync::Arc;
use tracing::{debug, info};

use super::login::{begin_login, consume_login, AuthError};
use super::models::{Account, CallbackParams, LoginResponse};
use super::session::Session;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};

/// GET /api/v1/auth/google/login
/// Starts a login attempt and redirects the browser to Google
///
/// # Response
/// `302 Found` with `Location: <google authorization url>`, plus a
/// `Set-Cookie` that (re)issues the session cookie with a fresh `Max-Age`.
pub async fn google_login(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let (attempt, challenge) = begin_login(&session).await?;
    let auth_url = state
        .google_service
        .authorization_url(&attempt.csrf_state, &challenge);

    info!(
        session = %safe_token_log(session.id()),
        "Starting Google OAuth flow"
    );

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&auth_url)
        .map_err(|_| ApiError::InternalServer("Failed to generate auth URL".to_string()))?;
    headers.insert(LOCATION, location);
    if let Some(cookie) =
        session.set_cookie(state.config.session_ttl, state.config.session_cookie_secure)
    {
        headers.insert(SET_COOKIE, cookie);
    }

    Ok((StatusCode::FOUND, headers))
}

/// GET /api/v1/auth/google/callback?state=&code=
/// Completes a login attempt and issues a session token
///
/// # Response
/// ```json
/// {
///   "access_token": "<jwt>",
///   "user": { "id": 1, "email": "...", "name": "...", ... }
/// }
/// ```
pub async fn google_callback(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    Query(params): Query<CallbackParams>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = complete_login(&state, &session, &params).await?;
    Ok(Json(response))
}

/// Callback pipeline: verify the attempt, exchange, resolve, issue.
/// Nothing here retries; any failure ends the attempt.
async fn complete_login(
    state: &AppState,
    session: &Session,
    params: &CallbackParams,
) -> Result<LoginResponse, AuthError> {
    let verifier = consume_login(session, &params.state).await?;

    if let Some(error) = &params.error {
        return Err(AuthError::ProviderDenied(error.clone()));
    }
    if params.code.is_empty() {
        return Err(AuthError::MissingCode);
    }

    debug!(
        session = %safe_token_log(session.id()),
        code = %safe_token_log(&params.code),
        "Login attempt verified, exchanging code"
    );

    let identity = state
        .google_service
        .exchange_code_for_identity(&params.code, &verifier, state.config.oauth_timeout)
        .await?;

    if state.config.require_verified_email && !identity.email_verified {
        return Err(AuthError::UnverifiedEmail);
    }

    let account: Account = state.resolver.resolve_or_create(&identity).await?;
    let access_token = state.tokens.issue(account.id)?;

    info!(
        account_id = account.id,
        email = %safe_email_log(&account.email),
        provider = identity.provider.as_str(),
        "User authentication successful via Google OAuth"
    );

    Ok(LoginResponse {
        access_token,
        user: account,
    })
}
