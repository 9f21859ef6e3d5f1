//! User (principal) model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub role: String,
    pub email_verified: bool,
    pub password_hash: String,
    /// Credentials issued before this instant are stale.
    pub password_changed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl User {
    /// Whether a credential issued at `issued_at` (Unix seconds) predates
    /// the last password change.
    ///
    /// Compared at full precision: a change at 10:00:00.8 makes a credential
    /// with `iat` 10:00:00 stale. Pairs minted after a change carry an `iat`
    /// rounded up past it.
    pub fn password_changed_after(&self, issued_at: i64) -> bool {
        self.password_changed_at.is_some_and(|changed| {
            changed.timestamp() > issued_at
                || (changed.timestamp() == issued_at && changed.timestamp_subsec_nanos() > 0)
        })
    }
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub role: String,
    pub email_verified: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
            email_verified: user.email_verified,
        }
    }
}

/// DTO for creating a new user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub role: String,
    pub email_verified: bool,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn user_changed_at(changed: Option<Timestamp>) -> User {
        User {
            id: 1,
            email: "u1@example.com".into(),
            role: "user".into(),
            email_verified: true,
            password_hash: String::new(),
            password_changed_at: changed,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn never_changed_is_never_stale() {
        assert!(!user_changed_at(None).password_changed_after(0));
    }

    #[test]
    fn change_later_in_the_same_second_is_stale() {
        let changed = Utc.timestamp_opt(1_000, 500_000_000).unwrap();
        let user = user_changed_at(Some(changed));

        assert!(user.password_changed_after(999));
        assert!(user.password_changed_after(1_000));
        assert!(!user.password_changed_after(1_001));
    }

    #[test]
    fn change_on_a_whole_second_spares_that_iat() {
        let changed = Utc.timestamp_opt(1_000, 0).unwrap();
        let user = user_changed_at(Some(changed));

        assert!(user.password_changed_after(999));
        assert!(!user.password_changed_after(1_000));
    }
}
