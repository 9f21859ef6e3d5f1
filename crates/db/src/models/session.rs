//! User session model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use warden_core::device::DeviceInfo;
use warden_core::types::{DbId, Timestamp};

/// A session row from the `user_sessions` table.
///
/// Contains the refresh-token hash -- NEVER serialize this to API responses.
/// Use [`SessionInfo`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub token_id: String,
    pub refresh_token_hash: String,
    pub device_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub last_activity: Timestamp,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserSession {
    /// Active means not revoked and not yet expired at `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    pub fn device(&self) -> DeviceInfo {
        DeviceInfo {
            device_name: self.device_name.clone(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Session metadata safe to show in a "manage your devices" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SessionInfo {
    pub id: DbId,
    /// Used server-side to flag the caller's own session; never serialized.
    #[serde(skip)]
    pub token_id: String,
    pub device_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub last_activity: Timestamp,
    pub created_at: Timestamp,
}

impl From<&UserSession> for SessionInfo {
    fn from(session: &UserSession) -> Self {
        Self {
            id: session.id,
            token_id: session.token_id.clone(),
            device_name: session.device_name.clone(),
            ip_address: session.ip_address.clone(),
            user_agent: session.user_agent.clone(),
            last_activity: session.last_activity,
            created_at: session.created_at,
        }
    }
}

/// DTO for creating a new user session.
///
/// `created_at` doubles as the initial `last_activity`.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub token_id: String,
    pub refresh_token_hash: String,
    pub device: DeviceInfo,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}
