pub mod admin;
pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          login (public)
/// /auth/refresh                        rotate refresh cookie (public)
/// /auth/logout                         revoke cookie's session (public)
/// /auth/logout-all                     revoke all own sessions (auth)
/// /auth/password                       change password (auth)
/// /auth/me                             caller info (optional auth)
/// /auth/sessions                       list own sessions (auth)
/// /auth/sessions/{id}                  revoke own session (auth)
///
/// /auth/admin/blacklist                blacklist an access token (admin)
/// /auth/admin/cleanup                  prune expired rows (admin)
/// /auth/admin/sessions/{token_id}      revoke any session (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/auth", auth::router().nest("/admin", admin::router()))
}
