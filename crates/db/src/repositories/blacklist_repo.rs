//! Repository for the `token_blacklist` table.

use async_trait::async_trait;
use sqlx::PgPool;
use warden_core::types::Timestamp;

use crate::models::blacklist::CreateBlacklistEntry;

/// Ledger of access credentials revoked before their natural expiry.
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Record a revoked credential. Re-adding a known `token_id` is a no-op;
    /// returns `true` only when a new entry was written.
    async fn add(&self, entry: &CreateBlacklistEntry) -> Result<bool, sqlx::Error>;

    /// Whether the credential with this `token_id` has been blacklisted.
    async fn exists(&self, token_id: &str) -> Result<bool, sqlx::Error>;

    /// Delete entries with `expires_at <= now`.
    async fn prune_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error>;
}

/// PostgreSQL-backed [`BlacklistStore`].
#[derive(Debug, Clone)]
pub struct PgBlacklistStore {
    pool: PgPool,
}

impl PgBlacklistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistStore for PgBlacklistStore {
    async fn add(&self, entry: &CreateBlacklistEntry) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO token_blacklist (token_id, user_id, expires_at, reason, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (token_id) DO NOTHING",
        )
        .bind(&entry.token_id)
        .bind(entry.user_id)
        .bind(entry.expires_at)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, token_id: &str) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE token_id = $1)")
                .bind(token_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn prune_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
