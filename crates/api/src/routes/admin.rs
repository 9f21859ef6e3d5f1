//! Route definitions for administrative credential controls.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/auth/admin`. All require the admin role.
///
/// ```text
/// POST   /blacklist             -> blacklist_token
/// POST   /cleanup               -> cleanup
/// DELETE /sessions/{token_id}   -> revoke_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blacklist", post(admin::blacklist_token))
        .route("/cleanup", post(admin::cleanup))
        .route("/sessions/{token_id}", delete(admin::revoke_session))
}
