//! Route definitions for the `/auth` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{auth, sessions};
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST   /login           -> login
/// POST   /refresh         -> refresh
/// POST   /logout          -> logout
/// POST   /logout-all      -> logout_all (requires auth)
/// POST   /password        -> change_password (requires auth)
/// GET    /me              -> me (optional auth)
/// GET    /sessions        -> list_sessions (requires auth)
/// DELETE /sessions/{id}   -> revoke_session (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/logout-all", post(auth::logout_all))
        .route("/password", post(auth::change_password))
        .route("/me", get(auth::me))
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{id}", delete(sessions::revoke_session))
}
