//! OAuth login attempts and the callback checks that guard them
//!
//! An attempt is one `{csrf_state, pkce_verifier}` pair stored in the browser's
//! session when login starts. The callback takes it out of the session before
//! anything else happens, so each attempt can be presented at most once.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use super::pkce::{generate_pkce, generate_state};
use super::session::{Session, SessionError};
use super::token::TokenError;
use crate::common::ApiError;
use crate::services::accounts::StoreError;
use crate::services::google::IdentityError;

pub const LOGIN_ATTEMPT_KEY: &str = "oauth_login";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("state parameter does not match this session's login attempt")]
    CsrfMismatch,

    #[error("no PKCE verifier for this login attempt")]
    PkceMissing,

    #[error("provider returned an error: {0}")]
    ProviderDenied(String),

    #[error("missing authorization code")]
    MissingCode,

    #[error("identity provider email is not verified")]
    UnverifiedEmail,

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("account store: {0}")]
    Store(#[from] StoreError),

    #[error("session store: {0}")]
    Session(#[from] SessionError),

    #[error("token: {0}")]
    Token(#[from] TokenError),

    #[error("corrupt login attempt in session")]
    CorruptAttempt,
}

impl From<AuthError> for ApiError {
    /// Callers only ever see a generic message; the cause is logged here.
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::CsrfMismatch
            | AuthError::PkceMissing
            | AuthError::CorruptAttempt
            | AuthError::MissingCode
            | AuthError::ProviderDenied(_) => {
                warn!(error = %err, "Login callback rejected");
                ApiError::BadRequest("invalid login attempt".to_string())
            }
            AuthError::UnverifiedEmail => {
                warn!(error = %err, "Login callback rejected");
                ApiError::Forbidden("email address is not verified".to_string())
            }
            AuthError::Identity(_)
            | AuthError::Store(_)
            | AuthError::Session(_)
            | AuthError::Token(_) => {
                error!(error = %err, "Login failed");
                ApiError::InternalServer("authentication failed".to_string())
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub csrf_state: String,
    pub pkce_verifier: String,
}

/// Generates a fresh attempt, persists it in the session and returns the
/// attempt together with its PKCE challenge.
pub async fn begin_login(session: &Session) -> Result<(LoginAttempt, String), AuthError> {
    let pkce = generate_pkce();
    let attempt = LoginAttempt {
        csrf_state: generate_state(),
        pkce_verifier: pkce.verifier,
    };

    let encoded = serde_json::to_string(&attempt).map_err(|_| AuthError::CorruptAttempt)?;
    session.set(LOGIN_ATTEMPT_KEY, encoded).await?;
    session.save().await?;

    Ok((attempt, pkce.challenge))
}

/// Consumes the session's pending attempt and checks it against the presented
/// `state`. On success returns the PKCE verifier to send with the code exchange.
pub async fn consume_login(session: &Session, state: &str) -> Result<String, AuthError> {
    // Taken unconditionally: a failed callback burns the attempt too.
    let attempt = match session.take(LOGIN_ATTEMPT_KEY).await? {
        Some(raw) => {
            session.save().await?;
            let attempt = serde_json::from_str::<LoginAttempt>(&raw)
                .map_err(|_| AuthError::CorruptAttempt)?;
            Some(attempt)
        }
        None => None,
    };
    verify_attempt(attempt.as_ref(), state)
}

/// The `CallbackReceived -> Verified` transition.
pub fn verify_attempt(attempt: Option<&LoginAttempt>, state: &str) -> Result<String, AuthError> {
    let attempt = attempt.ok_or(AuthError::CsrfMismatch)?;
    if state.is_empty() || attempt.csrf_state.is_empty() || state != attempt.csrf_state {
        return Err(AuthError::CsrfMismatch);
    }
    if attempt.pkce_verifier.is_empty() {
        return Err(AuthError::PkceMissing);
    }
    Ok(attempt.pkce_verifier.clone())
}
