//! The token service: one object owning every credential lifecycle operation.
//!
//! Constructed once at startup with its stores, signing keys, hasher, and
//! clock injected. Issuance, validation, and rotation live in sibling
//! modules as further `impl TokenService` blocks; this module holds the
//! session-management operations (logout, revocation, listing, blacklist,
//! cleanup).

use std::sync::Arc;

use chrono::DateTime;
use serde::Serialize;
use warden_core::clock::Clock;
use warden_core::types::{DbId, Timestamp};
use warden_db::models::blacklist::CreateBlacklistEntry;
use warden_db::models::session::SessionInfo;
use warden_db::models::user::{User, UserResponse};
use warden_db::repositories::{BlacklistStore, SessionStore, UserStore};

use super::error::AuthError;
use super::jwt::{AccessClaims, JwtConfig, TokenKeys};
use super::password::SecretHasher;

/// The stores the token service reads and writes.
#[derive(Clone)]
pub struct TokenStores {
    pub sessions: Arc<dyn SessionStore>,
    pub blacklist: Arc<dyn BlacklistStore>,
    pub users: Arc<dyn UserStore>,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access credential lifetime in seconds.
    pub expires_in: i64,
    /// Absolute expiry of the refresh credential and its session.
    pub refresh_expires_at: Timestamp,
    /// Token id shared by both halves.
    pub token_id: String,
    pub user: UserResponse,
}

/// Result of a successful [`TokenService::validate_for_request`].
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub user: User,
    pub token_id: String,
    pub claims: AccessClaims,
}

/// Rows removed by [`TokenService::cleanup_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub sessions: u64,
    pub blacklist: u64,
}

/// Issues, validates, rotates, and revokes credentials.
pub struct TokenService {
    pub(super) sessions: Arc<dyn SessionStore>,
    pub(super) blacklist: Arc<dyn BlacklistStore>,
    pub(super) users: Arc<dyn UserStore>,
    pub(super) config: JwtConfig,
    pub(super) keys: TokenKeys,
    pub(super) hasher: SecretHasher,
    pub(super) clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        stores: TokenStores,
        config: JwtConfig,
        hasher: SecretHasher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let keys = TokenKeys::new(&config);
        Self {
            sessions: stores.sessions,
            blacklist: stores.blacklist,
            users: stores.users,
            config,
            keys,
            hasher,
            clock,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn hasher(&self) -> &SecretHasher {
        &self.hasher
    }

    /// Principal lookups for the login and password-change handlers.
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Revoke the session behind a refresh credential.
    ///
    /// Best effort: an invalid, expired, or already revoked credential is
    /// silently ignored and storage failures are only logged, so logout
    /// never fails observably.
    pub async fn logout(&self, raw_refresh_token: &str) {
        let claims = match self.keys.decode_refresh(raw_refresh_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Logout with unverifiable refresh token ignored");
                return;
            }
        };

        match self
            .sessions
            .revoke_by_token_id(&claims.jti, self.now())
            .await
        {
            Ok(revoked) => {
                tracing::info!(user_id = claims.sub, revoked, "Session logged out");
            }
            Err(e) => {
                tracing::warn!(user_id = claims.sub, error = %e, "Logout revocation failed");
            }
        }
    }

    /// Revoke every active session of a user ("sign out everywhere").
    ///
    /// Used by explicit logout-all, password change, and reuse containment.
    pub async fn logout_all(&self, user_id: DbId) -> Result<u64, AuthError> {
        let revoked = self
            .sessions
            .revoke_all_for_user(user_id, self.now())
            .await?;
        tracing::info!(user_id, revoked, "Revoked all sessions for user");
        Ok(revoked)
    }

    /// Administrative revoke of a single session by token id.
    ///
    /// Returns `false` if no unrevoked session carries that token id.
    pub async fn revoke_session(&self, token_id: &str) -> Result<bool, AuthError> {
        let revoked = self
            .sessions
            .revoke_by_token_id(token_id, self.now())
            .await?;
        tracing::info!(revoked, "Administrative session revocation");
        Ok(revoked)
    }

    /// Self-service revoke ("sign out this device").
    ///
    /// Fails with [`AuthError::NotFound`] unless `session_id` is an active
    /// session owned by `user_id`; foreign sessions are indistinguishable
    /// from missing ones.
    pub async fn revoke_own_session(
        &self,
        user_id: DbId,
        session_id: DbId,
    ) -> Result<(), AuthError> {
        if self
            .sessions
            .revoke_for_user_by_id(user_id, session_id, self.now())
            .await?
        {
            tracing::info!(user_id, session_id, "User revoked own session");
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }

    /// Active sessions of a user, without secret material.
    pub async fn list_sessions(&self, user_id: DbId) -> Result<Vec<SessionInfo>, AuthError> {
        Ok(self
            .sessions
            .list_active_for_user(user_id, self.now())
            .await?)
    }

    /// Blacklist one specific access credential until its natural expiry.
    ///
    /// The signature must verify; expiry does not. An already expired
    /// credential cannot be used anyway, so it is not recorded and `false`
    /// is returned. Re-blacklisting is idempotent.
    pub async fn blacklist_access_token(
        &self,
        raw_access_token: &str,
        reason: &str,
    ) -> Result<bool, AuthError> {
        let claims = self
            .keys
            .decode_access(raw_access_token)
            .map_err(|_| AuthError::BadSignature)?;

        let now = self.now();
        if claims.exp <= now.timestamp() {
            return Ok(false);
        }
        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::BadSignature)?;

        let entry = CreateBlacklistEntry {
            token_id: claims.jti,
            user_id: claims.sub,
            expires_at,
            reason: reason.to_string(),
            created_at: now,
        };
        self.blacklist.add(&entry).await?;
        tracing::warn!(user_id = entry.user_id, reason, "Access token blacklisted");
        Ok(true)
    }

    /// Stamp a password change and sign the user out everywhere.
    ///
    /// `password_hash` must already be hashed (see [`SecretHasher::hash`]).
    /// Access credentials issued before this call are rejected by the gate
    /// with [`AuthError::PasswordChanged`] from now on.
    pub async fn record_password_change(
        &self,
        user_id: DbId,
        password_hash: &str,
    ) -> Result<u64, AuthError> {
        if !self
            .users
            .update_password(user_id, password_hash, self.now())
            .await?
        {
            return Err(AuthError::Unauthorized("User no longer exists".into()));
        }
        self.logout_all(user_id).await
    }

    /// Prune rows past their expiry from both stores. Idempotent.
    pub async fn cleanup_expired(&self) -> Result<CleanupReport, AuthError> {
        let now = self.now();
        let report = CleanupReport {
            sessions: self.sessions.prune_expired(now).await?,
            blacklist: self.blacklist.prune_expired(now).await?,
        };
        tracing::info!(
            sessions = report.sessions,
            blacklist = report.blacklist,
            "Pruned expired credentials"
        );
        Ok(report)
    }
}
