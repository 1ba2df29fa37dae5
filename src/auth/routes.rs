//! Authentication routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /api/v1/auth/google/login` - Start Google OAuth (PKCE) flow
/// - `GET /api/v1/auth/google/callback` - Complete the flow and issue a session token
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/v1/auth/google/login", get(handlers::google_login))
        .route("/api/v1/auth/google/callback", get(handlers::google_callback))
}
