//! Credential issuance.

use chrono::Duration;
use warden_core::device::DeviceInfo;
use warden_core::types::Timestamp;
use warden_db::models::session::CreateSession;
use warden_db::models::user::{User, UserResponse};

use super::error::AuthError;
use super::jwt::{generate_token_id, AccessClaims, RefreshClaims, REFRESH_TOKEN_TYPE};
use super::service::{IssuedPair, TokenService};

/// Drop sub-second precision so stored instants line up with JWT claims.
fn whole_seconds(ts: Timestamp) -> Timestamp {
    ts - Duration::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}

/// The `iat` for a new pair: `now` in whole seconds, but never earlier than
/// the principal's last password change rounded up to the next second.
fn issue_instant(now: Timestamp, password_changed_at: Option<Timestamp>) -> Timestamp {
    let issued_at = whole_seconds(now);
    match password_changed_at {
        Some(changed) if changed > issued_at => {
            let floor = whole_seconds(changed);
            if floor == changed {
                floor
            } else {
                floor + Duration::seconds(1)
            }
        }
        _ => issued_at,
    }
}

impl TokenService {
    /// Mint a credential pair after password or OAuth verification succeeded.
    pub async fn issue_for_login(
        &self,
        user: &User,
        device: DeviceInfo,
    ) -> Result<IssuedPair, AuthError> {
        let pair = self.issue(user, device).await?;
        tracing::info!(user_id = user.id, "Issued credentials for login");
        Ok(pair)
    }

    /// Mint a linked access/refresh pair and persist its session row.
    ///
    /// The pair is only returned once the session write has succeeded, so a
    /// caller never holds a refresh credential without a matching row.
    pub(super) async fn issue(
        &self,
        user: &User,
        device: DeviceInfo,
    ) -> Result<IssuedPair, AuthError> {
        let (pair, session) = self.mint(user, device)?;
        let session = self.sessions.create(&session).await?;
        tracing::debug!(user_id = user.id, session_id = session.id, "Session created");
        Ok(pair)
    }

    /// Sign a pair and build the session row for it without writing anything.
    pub(super) fn mint(
        &self,
        user: &User,
        device: DeviceInfo,
    ) -> Result<(IssuedPair, CreateSession), AuthError> {
        let issued_at = issue_instant(self.now(), user.password_changed_at);
        let access_expires_at = issued_at + Duration::seconds(self.config.access_ttl_secs());
        let refresh_expires_at = issued_at + Duration::seconds(self.config.refresh_ttl_secs());
        let token_id = generate_token_id();

        let access_token = self.keys.encode_access(&AccessClaims {
            jti: token_id.clone(),
            sub: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            email_verified: user.email_verified,
            iat: issued_at.timestamp(),
            exp: access_expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        })?;

        let refresh_token = self.keys.encode_refresh(&RefreshClaims {
            jti: token_id.clone(),
            sub: user.id,
            typ: REFRESH_TOKEN_TYPE.to_string(),
            iat: issued_at.timestamp(),
            exp: refresh_expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        })?;

        let session = CreateSession {
            user_id: user.id,
            token_id: token_id.clone(),
            refresh_token_hash: self.hasher.hash(&refresh_token)?,
            device,
            expires_at: refresh_expires_at,
            created_at: issued_at,
        };

        let pair = IssuedPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_ttl_secs(),
            refresh_expires_at,
            token_id,
            user: UserResponse::from(user),
        };
        Ok((pair, session))
    }
}
