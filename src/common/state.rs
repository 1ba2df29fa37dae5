// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::resolver::AccountResolver;
use crate::auth::session::SessionStore;
use crate::auth::token::TokenService;
use crate::services::{AccountStore, GoogleService};

/// Application state: database pool, collaborators and read-only configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub resolver: AccountResolver,
    pub google_service: Arc<GoogleService>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        config: AppConfig,
        sessions: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
        google_service: GoogleService,
    ) -> Self {
        let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.jwt_ttl);
        Self {
            db,
            resolver: AccountResolver::new(accounts.clone()),
            config: Arc::new(config),
            sessions,
            accounts,
            google_service: Arc::new(google_service),
            tokens: Arc::new(tokens),
        }
    }
}
