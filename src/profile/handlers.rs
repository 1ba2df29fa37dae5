// src/profile/handlers.rs

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::AuthedAccount;
use crate::common::{ApiError, AppState};
use crate::services::accounts::StoreError;

/// GET /api/v1/profile - Get the signed-in account
///
/// # Response
/// ```json
/// {
///   "message": "success",
///   "user": { "id": 1, "email": "...", "name": "...", ... }
/// }
/// ```
pub async fn profile_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedAccount,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account = state
        .accounts
        .find_by_id(authed.account_id)
        .await
        .map_err(|e| match e {
            StoreError::Database(e) => ApiError::DatabaseError(e),
            other => ApiError::InternalServer(other.to_string()),
        })?;

    let Some(account) = account else {
        warn!(account_id = authed.account_id, "Token refers to a missing account");
        return Err(ApiError::NotFound("user not found".to_string()));
    };

    debug!(account_id = account.id, "Profile loaded");
    Ok(Json(serde_json::json!({
        "message": "success",
        "user": account,
    })))
}
