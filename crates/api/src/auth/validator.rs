//! Access-credential validation and the per-request authentication check.

use super::error::AuthError;
use super::jwt::AccessClaims;
use super::service::{AuthenticatedRequest, TokenService};

impl TokenService {
    /// Verify an access credential: signature, issuer, audience, expiry,
    /// then the blacklist. Read-only.
    pub async fn validate_access(&self, raw_access_token: &str) -> Result<AccessClaims, AuthError> {
        let claims = self
            .keys
            .decode_access(raw_access_token)
            .map_err(|_| AuthError::BadSignature)?;

        if claims.exp <= self.now().timestamp() {
            return Err(AuthError::Expired);
        }

        if self.blacklist.exists(&claims.jti).await? {
            tracing::debug!(user_id = claims.sub, "Rejected blacklisted access token");
            return Err(AuthError::Revoked);
        }

        Ok(claims)
    }

    /// Full check for a protected request: validate the credential, load
    /// the principal, and reject credentials that predate the principal's
    /// latest password change. On success the session's `last_activity` is
    /// bumped; a failed bump is logged, not surfaced.
    pub async fn validate_for_request(
        &self,
        raw_access_token: &str,
    ) -> Result<AuthenticatedRequest, AuthError> {
        let claims = self.validate_access(raw_access_token).await?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("User no longer exists".into()))?;

        if user.password_changed_after(claims.iat) {
            return Err(AuthError::PasswordChanged);
        }

        if let Err(e) = self.sessions.touch(&claims.jti, self.now()).await {
            tracing::warn!(user_id = user.id, error = %e, "Failed to record session activity");
        }

        Ok(AuthenticatedRequest {
            user,
            token_id: claims.jti.clone(),
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;
    use warden_core::clock::Clock;
    use warden_db::repositories::UserStore;

    use super::*;
    use crate::auth::jwt::{generate_token_id, TokenKeys};
    use crate::auth::test_support::{test_jwt_config, Harness};

    #[tokio::test]
    async fn valid_token_yields_principal() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();

        let authed = h.service.validate_for_request(&pair.access_token).await.unwrap();
        assert_eq!(authed.user.id, user.id);
        assert_eq!(authed.token_id, pair.token_id);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();

        h.clock.advance(Duration::minutes(14));
        assert!(h.service.validate_access(&pair.access_token).await.is_ok());

        h.clock.advance(Duration::minutes(1));
        assert_matches!(
            h.service.validate_access(&pair.access_token).await,
            Err(AuthError::Expired)
        );
    }

    #[tokio::test]
    async fn tampered_or_foreign_tokens_are_bad_signatures() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();

        // Refresh half is signed with the other key.
        assert_matches!(
            h.service.validate_access(&pair.refresh_token).await,
            Err(AuthError::BadSignature)
        );

        let mut tampered = pair.access_token.clone();
        tampered.pop();
        tampered.push(if pair.access_token.ends_with('A') { 'B' } else { 'A' });
        assert_matches!(
            h.service.validate_access(&tampered).await,
            Err(AuthError::BadSignature)
        );

        assert_matches!(
            h.service.validate_access("").await,
            Err(AuthError::BadSignature)
        );
    }

    #[tokio::test]
    async fn wrong_issuer_is_a_bad_signature() {
        let h = Harness::new();
        let mut config = test_jwt_config();
        config.issuer = "someone-else".to_string();
        let now = h.clock.now().timestamp();
        let token = TokenKeys::new(&config)
            .encode_access(&AccessClaims {
                jti: generate_token_id(),
                sub: 1,
                email: "u1@example.com".into(),
                role: "user".into(),
                email_verified: true,
                iat: now,
                exp: now + 900,
                iss: config.issuer.clone(),
                aud: config.audience.clone(),
            })
            .unwrap();

        assert_matches!(
            h.service.validate_access(&token).await,
            Err(AuthError::BadSignature)
        );
    }

    #[tokio::test]
    async fn blacklist_takes_precedence_over_valid_signature() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let compromised = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();
        let other = h.service.issue_for_login(&user, h.device("Safari")).await.unwrap();

        h.service
            .blacklist_access_token(&compromised.access_token, "compromised")
            .await
            .unwrap();

        assert_matches!(
            h.service.validate_for_request(&compromised.access_token).await,
            Err(AuthError::Revoked)
        );
        assert!(h.service.validate_for_request(&other.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn stale_after_password_change() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();

        h.clock.advance(Duration::minutes(2));
        h.users
            .update_password(user.id, "$argon2id$new", h.clock.now())
            .await
            .unwrap();

        // Unexpired and not blacklisted, but older than the password change.
        assert!(h.service.validate_access(&pair.access_token).await.is_ok());
        assert_matches!(
            h.service.validate_for_request(&pair.access_token).await,
            Err(AuthError::PasswordChanged)
        );

        // A credential issued after the change is fine.
        let user = h.users.find_by_id(user.id).await.unwrap().unwrap();
        let fresh = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();
        assert!(h.service.validate_for_request(&fresh.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn missing_principal_is_unauthorized() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let mut ghost = user.clone();
        ghost.id = 999;
        let pair = h.service.issue_for_login(&ghost, h.device("Chrome")).await.unwrap();

        assert_matches!(
            h.service.validate_for_request(&pair.access_token).await,
            Err(AuthError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn authenticated_request_bumps_session_activity() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();
        let logged_in_at = h.clock.now();

        h.clock.advance(Duration::minutes(5));
        h.service.validate_for_request(&pair.access_token).await.unwrap();

        let listed = h.service.list_sessions(user.id).await.unwrap();
        assert_eq!(listed[0].last_activity, h.clock.now());
        assert_eq!(listed[0].created_at, logged_in_at);

        // Plain validation never writes.
        h.clock.advance(Duration::minutes(5));
        h.service.validate_access(&pair.access_token).await.unwrap();
        let listed = h.service.list_sessions(user.id).await.unwrap();
        assert_eq!(listed[0].last_activity, logged_in_at + Duration::minutes(5));
    }

    #[tokio::test]
    async fn session_outage_does_not_fail_the_request() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();

        h.sessions.set_unavailable(true);
        assert!(h.service.validate_for_request(&pair.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn blacklist_outage_propagates() {
        let h = Harness::new();
        let user = h.user("u1@example.com").await;
        let pair = h.service.issue_for_login(&user, h.device("Chrome")).await.unwrap();
        h.blacklist.set_unavailable(true);

        assert_matches!(
            h.service.validate_access(&pair.access_token).await,
            Err(AuthError::Storage(_))
        );
    }
}
