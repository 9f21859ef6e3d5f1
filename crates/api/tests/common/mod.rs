#![allow(dead_code)]

use std::sync::Arc;

use argon2::Params;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use warden_api::auth::jwt::JwtConfig;
use warden_api::auth::password::SecretHasher;
use warden_api::auth::{TokenService, TokenStores};
use warden_api::config::ServerConfig;
use warden_api::router::build_app_router;
use warden_api::state::AppState;
use warden_core::clock::{Clock, FixedClock};
use warden_core::roles::{ROLE_ADMIN, ROLE_USER};
use warden_core::types::Timestamp;
use warden_db::memory::{MemoryBlacklistStore, MemorySessionStore, MemoryUserStore};
use warden_db::models::user::{CreateUser, User};
use warden_db::repositories::UserStore;

pub const PASSWORD: &str = "correct-horse-battery-staple";

const CHROME_ON_MAC: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        secure_cookies: true,
        jwt: JwtConfig {
            access_secret: "integration-access-secret-0123456789".to_string(),
            refresh_secret: "integration-refresh-secret-0123456789".to_string(),
            issuer: "warden".to_string(),
            audience: "warden-app".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

/// The full router over in-memory stores, with handles for inspection.
pub struct TestApp {
    pub router: Router,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<MemorySessionStore>,
    pub blacklist: Arc<MemoryBlacklistStore>,
    pub users: Arc<MemoryUserStore>,
    pub clock: Arc<FixedClock>,
}

/// Build the application exactly as `main.rs` does, but on in-memory
/// stores and a pinned clock.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let clock = Arc::new(FixedClock::new(start));
    let sessions = Arc::new(MemorySessionStore::new());
    let blacklist = Arc::new(MemoryBlacklistStore::new());
    let users = Arc::new(MemoryUserStore::new(start));

    let tokens = Arc::new(TokenService::new(
        TokenStores {
            sessions: sessions.clone(),
            blacklist: blacklist.clone(),
            users: users.clone(),
        },
        config.jwt.clone(),
        SecretHasher::new(Params::new(1024, 1, 1, None).unwrap()),
        clock.clone(),
    ));

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        tokens: tokens.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        tokens,
        sessions,
        blacklist,
        users,
        clock,
    }
}

impl TestApp {
    pub async fn create_user(&self, email: &str) -> User {
        self.create_user_with_role(email, ROLE_USER).await
    }

    pub async fn create_admin(&self, email: &str) -> User {
        self.create_user_with_role(email, ROLE_ADMIN).await
    }

    async fn create_user_with_role(&self, email: &str, role: &str) -> User {
        let password_hash = self.tokens.hasher().hash(PASSWORD).unwrap();
        self.users
            .create(&CreateUser {
                email: email.to_string(),
                role: role.to_string(),
                email_verified: true,
                password_hash,
            })
            .await
            .unwrap()
    }

    pub fn clock_now(&self) -> Timestamp {
        self.clock.now()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Log in and return `(access_token, refresh_cookie_value)`.
    pub async fn login(&self, email: &str) -> (String, String) {
        let response = self
            .send(
                RequestBuilder::new(Method::POST, "/api/v1/auth/login")
                    .header("user-agent", CHROME_ON_MAC)
                    .json(serde_json::json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status(), 200, "login should succeed");
        let cookie = refresh_cookie(&response).expect("login sets the refresh cookie");
        let json = body_json(response).await;
        (json["access_token"].as_str().unwrap().to_string(), cookie)
    }
}

/// Small builder for test requests.
pub struct RequestBuilder {
    inner: axum::http::request::Builder,
}

impl RequestBuilder {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            inner: Request::builder().method(method).uri(uri),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    pub fn refresh_cookie(self, value: &str) -> Self {
        self.header(COOKIE.as_str(), &format!("refresh_token={value}"))
    }

    pub fn json(self, body: serde_json::Value) -> Request<Body> {
        self.inner
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn empty(self) -> Request<Body> {
        self.inner.body(Body::empty()).unwrap()
    }
}

/// The raw `Set-Cookie` header for the refresh cookie, if any.
pub fn refresh_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("refresh_token="))
        .map(str::to_string)
}

/// The value of a refresh cookie being set (not cleared) by the response.
pub fn refresh_cookie(response: &Response<Body>) -> Option<String> {
    let header = refresh_set_cookie(response)?;
    let value = header
        .trim_start_matches("refresh_token=")
        .split(';')
        .next()?
        .to_string();
    (!value.is_empty()).then_some(value)
}

/// Whether the response instructs the client to drop the refresh cookie.
pub fn clears_refresh_cookie(response: &Response<Body>) -> bool {
    refresh_set_cookie(response).is_some_and(|h| {
        h.starts_with("refresh_token=;") || h.contains("Max-Age=0")
    })
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
