//! JWT access/refresh credential encoding and decoding.
//!
//! Both halves of a pair are HS256-signed JWTs sharing one `jti` (the token
//! id that joins a presented credential to its session row). Access and
//! refresh credentials are signed with distinct secrets, so a leaked access
//! secret cannot mint refresh credentials.
//!
//! Expiry is deliberately NOT checked by `jsonwebtoken`: callers compare
//! `exp` against the service clock so expiry decisions are deterministic.

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use warden_core::types::DbId;

/// Value of the `typ` claim carried by refresh credentials.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Number of random bytes in a token id (256 bits).
const TOKEN_ID_BYTES: usize = 32;

/// Claims embedded in every access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token id shared with the paired refresh credential.
    pub jti: String,
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    pub email: String,
    /// The user's role name (e.g. `"admin"`, `"user"`).
    pub role: String,
    pub email_verified: bool,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Claims embedded in every refresh credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub jti: String,
    pub sub: DbId,
    /// Always [`REFRESH_TOKEN_TYPE`].
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret for access credentials.
    pub access_secret: String,
    /// HMAC-SHA256 secret for refresh credentials. Must differ from
    /// `access_secret`.
    pub refresh_secret: String,
    /// `iss` claim written and required.
    pub issuer: String,
    /// `aud` claim written and required.
    pub audience: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_expiry_mins", &self.access_token_expiry_mins)
            .field("refresh_token_expiry_days", &self.refresh_token_expiry_days)
            .finish()
    }
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
const DEFAULT_ISSUER: &str = "warden";
const DEFAULT_AUDIENCE: &str = "warden-app";

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default      |
    /// |----------------------------|----------|--------------|
    /// | `JWT_ACCESS_SECRET`        | **yes**  | --           |
    /// | `JWT_REFRESH_SECRET`       | **yes**  | --           |
    /// | `JWT_ISSUER`               | no       | `warden`     |
    /// | `JWT_AUDIENCE`             | no       | `warden-app` |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`         |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`          |
    ///
    /// # Panics
    ///
    /// Panics if either secret is missing or empty, if the two secrets are
    /// equal, or if an expiry is not a positive integer.
    pub fn from_env() -> Self {
        let access_secret = std::env::var("JWT_ACCESS_SECRET")
            .expect("JWT_ACCESS_SECRET must be set in the environment");
        assert!(!access_secret.is_empty(), "JWT_ACCESS_SECRET must not be empty");

        let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
            .expect("JWT_REFRESH_SECRET must be set in the environment");
        assert!(!refresh_secret.is_empty(), "JWT_REFRESH_SECRET must not be empty");
        assert_ne!(
            access_secret, refresh_secret,
            "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ"
        );

        let issuer = std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.into());
        let audience = std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.into());

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");
        assert!(access_token_expiry_mins > 0, "JWT_ACCESS_EXPIRY_MINS must be positive");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");
        assert!(refresh_token_expiry_days > 0, "JWT_REFRESH_EXPIRY_DAYS must be positive");

        Self {
            access_secret,
            refresh_secret,
            issuer,
            audience,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    /// Access credential lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    /// Refresh credential lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_token_expiry_days * 24 * 60 * 60
    }
}

/// Signing and verification material derived once from a [`JwtConfig`].
pub struct TokenKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
        }
    }

    pub fn encode_access(&self, claims: &AccessClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.access_encoding)
    }

    pub fn encode_refresh(
        &self,
        claims: &RefreshClaims,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.refresh_encoding)
    }

    /// Verify signature, issuer, and audience of an access credential.
    /// Expiry is left to the caller.
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        Ok(decode::<AccessClaims>(token, &self.access_decoding, &self.validation)?.claims)
    }

    /// Verify signature, issuer, and audience of a refresh credential.
    /// Expiry and the `typ` claim are left to the caller.
    pub fn decode_refresh(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        Ok(decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)?.claims)
    }
}

/// Generate a fresh 256-bit token id, hex-encoded (64 chars).
pub fn generate_token_id() -> String {
    let bytes: [u8; TOKEN_ID_BYTES] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
