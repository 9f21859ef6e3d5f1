//! Administrative credential controls (admin role only).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::CleanupReport;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /auth/admin/blacklist`.
#[derive(Debug, Deserialize, Validate)]
pub struct BlacklistRequest {
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(length(min = 1, max = 255))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BlacklistResponse {
    /// `false` when the token had already expired and nothing was recorded.
    pub blacklisted: bool,
}

/// POST /api/v1/auth/admin/blacklist
///
/// Block one specific access token until it expires.
pub async fn blacklist_token(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<BlacklistRequest>,
) -> AppResult<Json<BlacklistResponse>> {
    input.validate()?;
    let blacklisted = state
        .tokens
        .blacklist_access_token(&input.access_token, &input.reason)
        .await?;
    tracing::info!(admin_id = admin.user_id, blacklisted, "Admin blacklisted access token");
    Ok(Json(BlacklistResponse { blacklisted }))
}

/// POST /api/v1/auth/admin/cleanup
pub async fn cleanup(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<DataResponse<CleanupReport>>> {
    let report = state.tokens.cleanup_expired().await?;
    Ok(Json(DataResponse { data: report }))
}

/// DELETE /api/v1/auth/admin/sessions/{token_id}
///
/// Revoke any user's session by token id. 404 if no unrevoked session has it.
pub async fn revoke_session(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(token_id): Path<String>,
) -> AppResult<StatusCode> {
    if state.tokens.revoke_session(&token_id).await? {
        tracing::info!(admin_id = admin.user_id, "Admin revoked session");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(crate::auth::AuthError::NotFound.into())
    }
}
