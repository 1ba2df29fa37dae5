// src/profile/routes.rs

use axum::{middleware, routing::get, Router};

use super::handlers;
use crate::auth::require_auth;

/// Every route here sits behind the session token gate.
pub fn profile_routes() -> Router {
    Router::new()
        .route("/api/v1/profile", get(handlers::profile_handler))
        .route_layer(middleware::from_fn(require_auth))
}
