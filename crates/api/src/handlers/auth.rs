//! Handlers for the `/auth` resource (login, refresh, logout, password).
//!
//! The access credential is returned in the JSON body; the refresh
//! credential only ever travels in the `refresh_token` cookie.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;
use warden_core::error::CoreError;
use warden_db::models::user::UserResponse;

use crate::auth::password::{validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::auth::{AuthError, IssuedPair};
use crate::cookies::{clear_refresh_cookie, read_refresh_cookie, refresh_cookie};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::device::ClientDevice;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request body for `POST /auth/password`.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    pub new_password: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Response for `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: Option<UserResponse>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns the access token and sets the
/// refresh cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ClientDevice(device): ClientDevice,
    Json(input): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    input.validate()?;

    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid email or password".into()));

    let user = state
        .tokens
        .users()
        .find_by_email(&input.email)
        .await?
        .ok_or_else(invalid)?;

    let password_valid = state
        .tokens
        .hasher()
        .verify(&input.password, &user.password_hash)
        .map_err(AuthError::from)?;
    if !password_valid {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    let pair = state.tokens.issue_for_login(&user, device).await?;
    Ok(issued_response(&state, jar, pair))
}

/// POST /api/v1/auth/refresh
///
/// Rotate the refresh cookie into a new pair. Any failure clears the cookie.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    ClientDevice(device): ClientDevice,
) -> Result<(CookieJar, Json<AuthResponse>), (CookieJar, AppError)> {
    let Some(raw) = read_refresh_cookie(&jar) else {
        return Err((clear_refresh_cookie(jar), AuthError::InvalidRefreshToken.into()));
    };

    match state.tokens.refresh(&raw, device).await {
        Ok(pair) => Ok(issued_response(&state, jar, pair)),
        Err(e) => Err((clear_refresh_cookie(jar), e.into())),
    }
}

/// POST /api/v1/auth/logout
///
/// Revoke the session behind the refresh cookie. Always 204.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(raw) = read_refresh_cookie(&jar) {
        state.tokens.logout(&raw).await;
    }
    (clear_refresh_cookie(jar), StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// Revoke every session of the authenticated user. Returns 204.
pub async fn logout_all(
    State(state): State<AppState>,
    jar: CookieJar,
    auth_user: AuthUser,
) -> AppResult<(CookieJar, StatusCode)> {
    state.tokens.logout_all(auth_user.user_id).await?;
    Ok((clear_refresh_cookie(jar), StatusCode::NO_CONTENT))
}

/// POST /api/v1/auth/password
///
/// Change the caller's password, then sign them out everywhere.
pub async fn change_password(
    State(state): State<AppState>,
    jar: CookieJar,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<(CookieJar, StatusCode)> {
    input.validate()?;
    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let user = state
        .tokens
        .users()
        .find_by_id(auth_user.user_id)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User no longer exists".into()))?;

    let hasher = state.tokens.hasher();
    if !hasher
        .verify(&input.current_password, &user.password_hash)
        .map_err(AuthError::from)?
    {
        return Err(AppError::Core(CoreError::Validation(
            "Current password is incorrect".into(),
        )));
    }

    let new_hash = hasher.hash(&input.new_password).map_err(AuthError::from)?;
    let revoked = state
        .tokens
        .record_password_change(user.id, &new_hash)
        .await?;
    tracing::info!(user_id = user.id, revoked, "Password changed");

    Ok((clear_refresh_cookie(jar), StatusCode::NO_CONTENT))
}

/// GET /api/v1/auth/me
///
/// Describe the caller. Anonymous callers get `authenticated: false`.
pub async fn me(
    State(state): State<AppState>,
    MaybeAuthUser(auth_user): MaybeAuthUser,
) -> AppResult<Json<MeResponse>> {
    let Some(auth_user) = auth_user else {
        return Ok(Json(MeResponse {
            authenticated: false,
            user: None,
        }));
    };

    let user = state.tokens.users().find_by_id(auth_user.user_id).await?;
    Ok(Json(MeResponse {
        authenticated: user.is_some(),
        user: user.as_ref().map(UserResponse::from),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Put the refresh half in the cookie and the access half in the body.
fn issued_response(
    state: &AppState,
    jar: CookieJar,
    pair: IssuedPair,
) -> (CookieJar, Json<AuthResponse>) {
    let cookie = refresh_cookie(
        pair.refresh_token,
        state.config.jwt.refresh_ttl_secs(),
        state.config.secure_cookies,
    );
    (
        jar.add(cookie),
        Json(AuthResponse {
            access_token: pair.access_token,
            expires_in: pair.expires_in,
            user: pair.user,
        }),
    )
}
