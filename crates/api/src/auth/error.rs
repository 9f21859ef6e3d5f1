//! Error taxonomy of the token subsystem.

/// Every way a credential operation can fail.
///
/// Validation failures are terminal: callers re-authenticate or re-request a
/// refresh; nothing here is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Access credential is past its `exp`.
    #[error("Access token has expired")]
    Expired,

    /// Access credential is malformed, forged, or issued for another
    /// issuer/audience.
    #[error("Invalid access token")]
    BadSignature,

    /// Access credential was explicitly blacklisted.
    #[error("Access token has been revoked")]
    Revoked,

    /// A refresh credential was presented after its session stopped being
    /// active. Every session of the user has been revoked as a side effect.
    #[error("Refresh token reuse detected; all sessions have been signed out")]
    TokenReuseDetected,

    /// Refresh credential failed signature or expiry checks. Not proof of
    /// replay, so no mass revocation.
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,

    /// Credential was issued before the principal's latest password change.
    #[error("Password was changed; please sign in again")]
    PasswordChanged,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session does not exist, is inactive, or belongs to someone else.
    #[error("Session not found")]
    NotFound,

    /// Store failure, propagated unchanged.
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Signing failure while minting a credential.
    #[error("Token encoding error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Hashing error: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Expired => "TOKEN_EXPIRED",
            AuthError::BadSignature => "INVALID_TOKEN",
            AuthError::Revoked => "TOKEN_REVOKED",
            AuthError::TokenReuseDetected => "TOKEN_REUSE_DETECTED",
            AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AuthError::PasswordChanged => "PASSWORD_CHANGED",
            AuthError::Unauthorized(_) => "UNAUTHORIZED",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::Storage(_) | AuthError::Token(_) | AuthError::Hashing(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::Hashing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_has_its_own_code() {
        assert_eq!(AuthError::TokenReuseDetected.code(), "TOKEN_REUSE_DETECTED");
        assert_ne!(
            AuthError::TokenReuseDetected.code(),
            AuthError::InvalidRefreshToken.code()
        );
    }

    #[test]
    fn infrastructure_failures_share_internal_code() {
        assert_eq!(AuthError::Storage(sqlx::Error::PoolTimedOut).code(), "INTERNAL_ERROR");
        assert_eq!(AuthError::Hashing("boom".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn display_unauthorized() {
        let err = AuthError::Unauthorized("Missing Authorization header".into());
        assert_eq!(err.to_string(), "Unauthorized: Missing Authorization header");
    }
}
