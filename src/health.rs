// src/health.rs
//! Liveness endpoint

use axum::{extract::Extension, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

use crate::common::AppState;

pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

/// GET /health - reports whether the database answers
pub async fn health_check(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    if let Err(e) = sqlx::query("SELECT 1").execute(&state.db).await {
        error!(error = %e, "Health check database ping failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "error",
                "message": "Database connection failed",
            })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "message": "Service is healthy",
            "time": Utc::now().to_rfc3339(),
        })),
    )
}
