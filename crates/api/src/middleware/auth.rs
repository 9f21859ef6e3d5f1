//! JWT-based authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use warden_core::types::DbId;

use crate::auth::AuthError;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the `Authorization` header.
///
/// The token is fully validated: signature, expiry, blacklist, the user
/// still existing, and no password change since issuance.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// Token id of the presented credential; identifies the caller's session.
    pub token_id: String,
    /// The user's role name (e.g. `"admin"`, `"user"`).
    pub role: String,
    pub email: String,
    pub email_verified: bool,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AuthError::Unauthorized("Missing Authorization header".into()))?;

        let token = bearer_token(auth_header).ok_or_else(|| {
            AuthError::Unauthorized("Invalid Authorization format. Expected: Bearer <token>".into())
        })?;

        let authed = state.tokens.validate_for_request(token).await?;

        Ok(AuthUser {
            user_id: authed.user.id,
            token_id: authed.token_id,
            role: authed.user.role,
            email: authed.user.email,
            email_verified: authed.user.email_verified,
        })
    }
}

/// Optional authentication for endpoints that serve both anonymous and
/// signed-in callers.
///
/// A missing or invalid credential yields `MaybeAuthUser(None)`. Storage
/// failures still reject the request, so an outage is never mistaken for an
/// anonymous caller.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(AppError::Auth(AuthError::Storage(e))) => Err(AppError::Database(e)),
            Err(_) => Ok(MaybeAuthUser(None)),
        }
    }
}

/// Strip the `Bearer` scheme from an `Authorization` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
