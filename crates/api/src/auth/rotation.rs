//! Refresh-credential rotation with reuse detection.
//!
//! Every refresh credential is single-use. Presenting one whose session is
//! no longer active means the credential has been copied: the legitimate
//! holder and an attacker both have it. Since we cannot tell which caller
//! is which, every session of the user is revoked.

use warden_core::device::DeviceInfo;
use warden_core::types::DbId;

use super::error::AuthError;
use super::jwt::REFRESH_TOKEN_TYPE;
use super::service::{IssuedPair, TokenService};

impl TokenService {
    /// Exchange a refresh credential for a new pair, consuming the old one.
    ///
    /// `device` carries whatever the current request could observe; missing
    /// fields are inherited from the consumed session.
    pub async fn refresh(
        &self,
        raw_refresh_token: &str,
        device: DeviceInfo,
    ) -> Result<IssuedPair, AuthError> {
        let claims = self
            .keys
            .decode_refresh(raw_refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        if claims.typ != REFRESH_TOKEN_TYPE {
            return Err(AuthError::InvalidRefreshToken);
        }
        let now = self.now();
        if claims.exp <= now.timestamp() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let Some(session) = self
            .sessions
            .find_active_by_token_id(&claims.jti, now)
            .await?
        else {
            // Validly signed and unexpired, yet no active session: already
            // rotated, logged out, or revoked.
            return Err(self.reject_reuse(claims.sub).await);
        };

        if session.user_id != claims.sub
            || !self
                .hasher
                .verify(raw_refresh_token, &session.refresh_token_hash)?
        {
            return Err(self.reject_reuse(claims.sub).await);
        }

        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            self.sessions.revoke_if_active(&claims.jti, now).await?;
            return Err(AuthError::InvalidRefreshToken);
        };
        if user.password_changed_after(claims.iat) {
            self.sessions.revoke_if_active(&claims.jti, now).await?;
            return Err(AuthError::PasswordChanged);
        }

        let (pair, successor) = self.mint(&user, device.or(session.device()))?;

        // `None` means a concurrent caller consumed the same credential first.
        let Some(successor) = self
            .sessions
            .rotate(&claims.jti, &successor, now)
            .await?
        else {
            return Err(self.reject_reuse(user.id).await);
        };
        tracing::info!(
            user_id = user.id,
            session_id = session.id,
            successor_id = successor.id,
            "Refresh token rotated"
        );
        Ok(pair)
    }

    /// Contain a replayed refresh credential by signing the user out
    /// everywhere. Returns the error to surface to the caller.
    async fn reject_reuse(&self, user_id: DbId) -> AuthError {
        match self.sessions.revoke_all_for_user(user_id, self.now()).await {
            Ok(revoked) => {
                tracing::warn!(
                    user_id,
                    revoked,
                    "Refresh token reuse detected, revoked all sessions"
                );
                AuthError::TokenReuseDetected
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to revoke sessions after token reuse");
                AuthError::Storage(e)
            }
        }
    }
}
