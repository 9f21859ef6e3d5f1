//! Handlers for the caller's own sessions ("manage your devices").

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use warden_core::types::DbId;
use warden_db::models::session::SessionInfo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// One active session as shown to its owner.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: SessionInfo,
    /// Whether this is the session the request was made from.
    pub current: bool,
}

/// GET /api/v1/auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionView>>>> {
    let sessions = state.tokens.list_sessions(auth_user.user_id).await?;
    let data = sessions
        .into_iter()
        .map(|session| SessionView {
            current: session.token_id == auth_user.token_id,
            session,
        })
        .collect();
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/auth/sessions/{id}
///
/// Sign out one of the caller's devices. 404 for sessions that are not the
/// caller's or are no longer active.
pub async fn revoke_session(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(session_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state
        .tokens
        .revoke_own_session(auth_user.user_id, session_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
