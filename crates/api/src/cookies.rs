//! The refresh-credential cookie.
//!
//! The refresh credential never appears in a response body. It travels in an
//! `HttpOnly`, `SameSite=Strict` cookie scoped to the auth routes so scripts
//! cannot read it and other API paths never receive it.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie carrying the refresh credential.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Path the refresh cookie is scoped to.
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

/// Build the refresh cookie for a freshly issued pair.
pub fn refresh_cookie(value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE_NAME, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path(REFRESH_COOKIE_PATH)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Remove the refresh cookie from the client.
pub fn clear_refresh_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(REFRESH_COOKIE_NAME).path(REFRESH_COOKIE_PATH))
}

/// The refresh credential presented by the client, if any.
pub fn read_refresh_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
