//! Repository for the `user_sessions` table.

use async_trait::async_trait;
use sqlx::PgPool;
use warden_core::types::{DbId, Timestamp};

use crate::models::session::{CreateSession, SessionInfo, UserSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_id, refresh_token_hash, device_name, ip_address, \
                        user_agent, last_activity, expires_at, revoked_at, created_at";

/// Durable record of one row per login, keyed by `token_id`.
///
/// `revoked_at` is monotonic: no method clears it once set. Revoked rows stay
/// until [`SessionStore::prune_expired`] removes them after `expires_at`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new active session.
    async fn create(&self, input: &CreateSession) -> Result<UserSession, sqlx::Error>;

    /// Find a session by token id regardless of its state.
    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<UserSession>, sqlx::Error>;

    /// Find a session that is neither revoked nor expired at `now`.
    async fn find_active_by_token_id(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error>;

    /// Atomically revoke the session only if it is still active at `now`.
    ///
    /// Returns `true` for exactly one of any number of concurrent callers.
    async fn revoke_if_active(&self, token_id: &str, now: Timestamp) -> Result<bool, sqlx::Error>;

    /// Atomically revoke `consumed_token_id` and insert `next` in its place.
    ///
    /// Returns `None`, writing nothing, if the consumed session is no longer
    /// active at `now`. The successor row is visible no later than the
    /// revocation, so a concurrent [`SessionStore::revoke_all_for_user`]
    /// that observes the revocation also observes the successor.
    async fn rotate(
        &self,
        consumed_token_id: &str,
        next: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error>;

    /// Bump `last_activity` of an active session. Never moves it backwards.
    async fn touch(&self, token_id: &str, now: Timestamp) -> Result<bool, sqlx::Error>;

    /// Revoke a session by token id. Returns `true` if the row was updated.
    async fn revoke_by_token_id(&self, token_id: &str, now: Timestamp)
        -> Result<bool, sqlx::Error>;

    /// Revoke an active session by surrogate id, only if `user_id` owns it.
    async fn revoke_for_user_by_id(
        &self,
        user_id: DbId,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error>;

    /// Revoke every active session of a user. Returns the count revoked.
    async fn revoke_all_for_user(&self, user_id: DbId, now: Timestamp)
        -> Result<u64, sqlx::Error>;

    /// Active sessions of a user, most recently active first.
    async fn list_active_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<SessionInfo>, sqlx::Error>;

    /// Delete sessions with `expires_at <= now`, revoked or not.
    async fn prune_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error>;
}

/// PostgreSQL-backed [`SessionStore`].
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions
                (user_id, token_id, refresh_token_hash, device_name, ip_address, user_agent,
                 last_activity, expires_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(input.user_id)
            .bind(&input.token_id)
            .bind(&input.refresh_token_hash)
            .bind(&input.device.device_name)
            .bind(&input.device.ip_address)
            .bind(&input.device.user_agent)
            .bind(input.created_at)
            .bind(input.expires_at)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_sessions WHERE token_id = $1");
        sqlx::query_as::<_, UserSession>(&query)
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_active_by_token_id(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE token_id = $1
               AND revoked_at IS NULL
               AND expires_at > $2"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(token_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn revoke_if_active(&self, token_id: &str, now: Timestamp) -> Result<bool, sqlx::Error> {
        // Single conditional UPDATE: Postgres row locking guarantees only one
        // concurrent caller observes `rows_affected = 1`.
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $2
             WHERE token_id = $1 AND revoked_at IS NULL AND expires_at > $2",
        )
        .bind(token_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rotate(
        &self,
        consumed_token_id: &str,
        next: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        // One statement: the conditional UPDATE takes the row lock, and the
        // INSERT only runs when it matched.
        let query = format!(
            "WITH consumed AS (
                UPDATE user_sessions SET revoked_at = $10
                WHERE token_id = $1 AND revoked_at IS NULL AND expires_at > $10
                RETURNING id
             )
             INSERT INTO user_sessions
                (user_id, token_id, refresh_token_hash, device_name, ip_address, user_agent,
                 last_activity, expires_at, created_at)
             SELECT $2, $3, $4, $5, $6, $7, $8, $9, $8 FROM consumed
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserSession>(&query)
            .bind(consumed_token_id)
            .bind(next.user_id)
            .bind(&next.token_id)
            .bind(&next.refresh_token_hash)
            .bind(&next.device.device_name)
            .bind(&next.device.ip_address)
            .bind(&next.device.user_agent)
            .bind(next.created_at)
            .bind(next.expires_at)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
    }

    async fn touch(&self, token_id: &str, now: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET last_activity = $2
             WHERE token_id = $1 AND revoked_at IS NULL AND expires_at > $2
               AND last_activity < $2",
        )
        .bind(token_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_by_token_id(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $2
             WHERE token_id = $1 AND revoked_at IS NULL",
        )
        .bind(token_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_for_user_by_id(
        &self,
        user_id: DbId,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $3
             WHERE id = $1 AND user_id = $2 AND revoked_at IS NULL AND expires_at > $3",
        )
        .bind(id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $2
             WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn list_active_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<SessionInfo>, sqlx::Error> {
        sqlx::query_as::<_, SessionInfo>(
            "SELECT id, token_id, device_name, ip_address, user_agent, last_activity, created_at
             FROM user_sessions
             WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2
             ORDER BY last_activity DESC, id DESC",
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
    }

    async fn prune_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
