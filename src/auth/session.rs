//! Server-side browser sessions
//!
//! A session is a bag of string values keyed by an opaque id carried in the
//! `pets_session` cookie. It only has to outlive one OAuth redirect round trip,
//! so expiry is owned by the store and kept short.

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::COOKIE, request::Parts, HeaderValue},
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::pkce::random_token;
use crate::common::{safe_token_log, ApiError, AppState};

pub const SESSION_COOKIE: &str = "pets_session";

const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend error: {0}")]
    Backend(String),
}

/// Per-browser key/value state. `take` must remove and return atomically.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError>;

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError>;

    async fn take(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError>;

    /// Restarts the expiry window of a session that already holds values.
    /// Unknown or expired ids are left alone.
    async fn save(&self, session_id: &str) -> Result<(), SessionError>;
}

#[derive(Debug, Clone)]
struct SessionEntry {
    values: HashMap<String, String>,
    expires_at: DateTime<Utc>,
}

/// Process-local session store with lazy expiry
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(10)),
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn prune(sessions: &mut HashMap<String, SessionEntry>, now: DateTime<Utc>) {
        sessions.retain(|_, entry| entry.expires_at > now);
    }

    fn fresh_entry(&self) -> SessionEntry {
        SessionEntry {
            values: HashMap::new(),
            expires_at: Utc::now() + self.ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|entry| entry.expires_at > Utc::now())
            .and_then(|entry| entry.values.get(key).cloned()))
    }

    async fn set(&self, session_id: &str, key: &str, value: String) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        Self::prune(&mut sessions, now);
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| self.fresh_entry())
            .values
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn take(&self, session_id: &str, key: &str) -> Result<Option<String>, SessionError> {
        let mut sessions = self.sessions.write().await;
        Self::prune(&mut sessions, Utc::now());
        Ok(sessions
            .get_mut(session_id)
            .and_then(|entry| entry.values.remove(key)))
    }

    async fn save(&self, session_id: &str) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        Self::prune(&mut sessions, now);
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.expires_at = now + self.ttl;
        }
        Ok(())
    }
}

/// Request-scoped handle onto the caller's session
pub struct Session {
    id: String,
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            id: random_token(SESSION_ID_BYTES),
            store,
        }
    }

    pub fn resume(id: String, store: Arc<dyn SessionStore>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn set(&self, key: &str, value: String) -> Result<(), SessionError> {
        self.store.set(&self.id, key, value).await
    }

    pub async fn take(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.store.take(&self.id, key).await
    }

    pub async fn save(&self) -> Result<(), SessionError> {
        self.store.save(&self.id).await
    }

    /// `Set-Cookie` value carrying this session's id. Sent on every login so the
    /// browser's expiry keeps pace with the store's.
    pub fn set_cookie(&self, max_age: std::time::Duration, secure: bool) -> Option<HeaderValue> {
        // Lax so the cookie survives the top-level redirect back from the provider
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            self.id,
            max_age.as_secs()
        );
        if secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

/// Pulls our session id out of a `Cookie` header, ignoring ids we could not have minted.
pub fn session_id_from_cookies(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|id| is_well_formed_id(id))
}

fn is_well_formed_id(id: &str) -> bool {
    id.len() == 43
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let store = app_state.sessions.clone();
        match session_id_from_cookies(parts) {
            Some(id) => {
                debug!(session = %safe_token_log(&id), "Resuming browser session");
                Ok(Session::resume(id, store))
            }
            None => Ok(Session::new(store)),
        }
    }
}
