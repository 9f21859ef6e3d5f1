//! Access-token blacklist model and DTOs.

use sqlx::FromRow;
use warden_core::types::{DbId, Timestamp};

/// A row from the `token_blacklist` table.
#[derive(Debug, Clone, FromRow)]
pub struct BlacklistEntry {
    pub id: DbId,
    pub token_id: String,
    pub user_id: DbId,
    /// Copied from the revoked credential's `exp`; the row is moot afterwards.
    pub expires_at: Timestamp,
    pub reason: String,
    pub created_at: Timestamp,
}

/// DTO for blacklisting one access credential.
#[derive(Debug, Clone)]
pub struct CreateBlacklistEntry {
    pub token_id: String,
    pub user_id: DbId,
    pub expires_at: Timestamp,
    pub reason: String,
    pub created_at: Timestamp,
}
