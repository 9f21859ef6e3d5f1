//! In-process store implementations.
//!
//! These back the token service in unit and HTTP tests. Each store keeps its
//! rows behind a single [`Mutex`], so every method is one critical section;
//! that is what gives [`MemorySessionStore::revoke_if_active`] the same
//! single-winner guarantee as the conditional `UPDATE` in Postgres.
//!
//! Every store can be switched into an "unavailable" mode where all calls
//! fail with [`sqlx::Error::PoolTimedOut`], to exercise storage-failure paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use warden_core::types::{DbId, Timestamp};

use crate::models::blacklist::{BlacklistEntry, CreateBlacklistEntry};
use crate::models::session::{CreateSession, SessionInfo, UserSession};
use crate::models::user::{CreateUser, User};
use crate::repositories::{BlacklistStore, SessionStore, UserStore};

/// Rows keyed by surrogate id, plus the next id to hand out.
#[derive(Debug)]
struct Table<T> {
    next_id: DbId,
    rows: BTreeMap<DbId, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> DbId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn check_available(flag: &AtomicBool) -> Result<(), sqlx::Error> {
    if flag.load(Ordering::SeqCst) {
        Err(sqlx::Error::PoolTimedOut)
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

fn insert_session(
    table: &mut Table<UserSession>,
    input: &CreateSession,
) -> Result<UserSession, sqlx::Error> {
    if table.rows.values().any(|s| s.token_id == input.token_id) {
        return Err(sqlx::Error::Protocol(
            "duplicate key value violates unique constraint uq_user_sessions_token_id".into(),
        ));
    }

    let id = table.allocate_id();
    let session = UserSession {
        id,
        user_id: input.user_id,
        token_id: input.token_id.clone(),
        refresh_token_hash: input.refresh_token_hash.clone(),
        device_name: input.device.device_name.clone(),
        ip_address: input.device.ip_address.clone(),
        user_agent: input.device.user_agent.clone(),
        last_activity: input.created_at,
        expires_at: input.expires_at,
        revoked_at: None,
        created_at: input.created_at,
    };
    table.rows.insert(id, session.clone());
    Ok(session)
}

/// In-memory [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    table: Mutex<Table<UserSession>>,
    unavailable: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every row, in insertion order, regardless of state.
    pub fn all(&self) -> Vec<UserSession> {
        lock(&self.table).rows.values().cloned().collect()
    }

    /// Number of active sessions a user holds at `now`.
    pub fn count_active_for_user(&self, user_id: DbId, now: Timestamp) -> usize {
        lock(&self.table)
            .rows
            .values()
            .filter(|s| s.user_id == user_id && s.is_active(now))
            .count()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, input: &CreateSession) -> Result<UserSession, sqlx::Error> {
        check_available(&self.unavailable)?;
        insert_session(&mut lock(&self.table), input)
    }

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<UserSession>, sqlx::Error> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|s| s.token_id == token_id)
            .cloned())
    }

    async fn find_active_by_token_id(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|s| s.token_id == token_id && s.is_active(now))
            .cloned())
    }

    async fn revoke_if_active(&self, token_id: &str, now: Timestamp) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        match table
            .rows
            .values_mut()
            .find(|s| s.token_id == token_id && s.is_active(now))
        {
            Some(session) => {
                session.revoked_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate(
        &self,
        consumed_token_id: &str,
        next: &CreateSession,
        now: Timestamp,
    ) -> Result<Option<UserSession>, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        let Some(consumed_id) = table
            .rows
            .values()
            .find(|s| s.token_id == consumed_token_id && s.is_active(now))
            .map(|s| s.id)
        else {
            return Ok(None);
        };

        let successor = insert_session(&mut table, next)?;
        if let Some(consumed) = table.rows.get_mut(&consumed_id) {
            consumed.revoked_at = Some(now);
        }
        Ok(Some(successor))
    }

    async fn touch(&self, token_id: &str, now: Timestamp) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        match table.rows.values_mut().find(|s| {
            s.token_id == token_id && s.is_active(now) && s.last_activity < now
        }) {
            Some(session) => {
                session.last_activity = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_by_token_id(
        &self,
        token_id: &str,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        match table
            .rows
            .values_mut()
            .find(|s| s.token_id == token_id && s.revoked_at.is_none())
        {
            Some(session) => {
                session.revoked_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_for_user_by_id(
        &self,
        user_id: DbId,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        match table.rows.get_mut(&id) {
            Some(session) if session.user_id == user_id && session.is_active(now) => {
                session.revoked_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        let mut revoked = 0;
        for session in table
            .rows
            .values_mut()
            .filter(|s| s.user_id == user_id && s.is_active(now))
        {
            session.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn list_active_for_user(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<SessionInfo>, sqlx::Error> {
        check_available(&self.unavailable)?;
        let table = lock(&self.table);
        let mut sessions: Vec<SessionInfo> = table
            .rows
            .values()
            .filter(|s| s.user_id == user_id && s.is_active(now))
            .map(SessionInfo::from)
            .collect();
        sessions.sort_by(|a, b| {
            b.last_activity
                .cmp(&a.last_activity)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(sessions)
    }

    async fn prune_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        let before = table.rows.len();
        table.rows.retain(|_, s| s.expires_at > now);
        Ok((before - table.rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Blacklist
// ---------------------------------------------------------------------------

/// In-memory [`BlacklistStore`].
#[derive(Debug, Default)]
pub struct MemoryBlacklistStore {
    table: Mutex<Table<BlacklistEntry>>,
    unavailable: AtomicBool,
}

impl MemoryBlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn all(&self) -> Vec<BlacklistEntry> {
        lock(&self.table).rows.values().cloned().collect()
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklistStore {
    async fn add(&self, entry: &CreateBlacklistEntry) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        if table.rows.values().any(|e| e.token_id == entry.token_id) {
            return Ok(false);
        }
        let id = table.allocate_id();
        table.rows.insert(
            id,
            BlacklistEntry {
                id,
                token_id: entry.token_id.clone(),
                user_id: entry.user_id,
                expires_at: entry.expires_at,
                reason: entry.reason.clone(),
                created_at: entry.created_at,
            },
        );
        Ok(true)
    }

    async fn exists(&self, token_id: &str) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.table)
            .rows
            .values()
            .any(|e| e.token_id == token_id))
    }

    async fn prune_expired(&self, now: Timestamp) -> Result<u64, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        let before = table.rows.len();
        table.rows.retain(|_, e| e.expires_at > now);
        Ok((before - table.rows.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// In-memory [`UserStore`].
#[derive(Debug)]
pub struct MemoryUserStore {
    table: Mutex<Table<User>>,
    created_at: Timestamp,
    unavailable: AtomicBool,
}

impl MemoryUserStore {
    /// Users inserted through [`UserStore::create`] get `created_at` as
    /// their creation time.
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            table: Mutex::new(Table::default()),
            created_at,
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, input: &CreateUser) -> Result<User, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        if table.rows.values().any(|u| u.email == input.email) {
            return Err(sqlx::Error::Protocol(
                "duplicate key value violates unique constraint uq_users_email".into(),
            ));
        }
        let id = table.allocate_id();
        let user = User {
            id,
            email: input.email.clone(),
            role: input.role.clone(),
            email_verified: input.email_verified,
            password_hash: input.password_hash.clone(),
            password_changed_at: None,
            created_at: self.created_at,
        };
        table.rows.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, sqlx::Error> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.table).rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        check_available(&self.unavailable)?;
        Ok(lock(&self.table)
            .rows
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_password(
        &self,
        id: DbId,
        password_hash: &str,
        changed_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        check_available(&self.unavailable)?;
        let mut table = lock(&self.table);
        match table.rows.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.password_changed_at = Some(changed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};
    use warden_core::device::DeviceInfo;

    use super::*;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn new_session(user_id: DbId, token_id: &str, expires_at: Timestamp) -> CreateSession {
        CreateSession {
            user_id,
            token_id: token_id.to_string(),
            refresh_token_hash: "$argon2id$stub".to_string(),
            device: DeviceInfo {
                device_name: Some("Chrome on macOS".into()),
                ..Default::default()
            },
            expires_at,
            created_at: t0(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_token_id() {
        let store = MemorySessionStore::new();
        store
            .create(&new_session(1, "tok-a", t0() + Duration::days(7)))
            .await
            .unwrap();

        let dup = store
            .create(&new_session(2, "tok-a", t0() + Duration::days(7)))
            .await;
        assert!(dup.is_err(), "token ids must be unique");
    }

    #[tokio::test]
    async fn find_active_excludes_revoked_and_expired() {
        let store = MemorySessionStore::new();
        store
            .create(&new_session(1, "live", t0() + Duration::days(7)))
            .await
            .unwrap();
        store
            .create(&new_session(1, "revoked", t0() + Duration::days(7)))
            .await
            .unwrap();
        store
            .create(&new_session(1, "expired", t0() + Duration::minutes(1)))
            .await
            .unwrap();
        store.revoke_by_token_id("revoked", t0()).await.unwrap();

        let now = t0() + Duration::minutes(2);
        assert!(store.find_active_by_token_id("live", now).await.unwrap().is_some());
        assert!(store.find_active_by_token_id("revoked", now).await.unwrap().is_none());
        assert!(store.find_active_by_token_id("expired", now).await.unwrap().is_none());

        // Revoked rows are retained until they expire.
        assert!(store.find_by_token_id("revoked").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn revocation_is_monotonic() {
        let store = MemorySessionStore::new();
        store
            .create(&new_session(1, "tok", t0() + Duration::days(7)))
            .await
            .unwrap();

        assert!(store.revoke_by_token_id("tok", t0()).await.unwrap());
        let later = t0() + Duration::hours(1);
        assert!(!store.revoke_by_token_id("tok", later).await.unwrap());
        assert!(!store.revoke_if_active("tok", later).await.unwrap());
        assert_eq!(store.revoke_all_for_user(1, later).await.unwrap(), 0);

        let row = store.find_by_token_id("tok").await.unwrap().unwrap();
        assert_eq!(row.revoked_at, Some(t0()), "first revocation time is kept");
    }

    #[tokio::test]
    async fn revoke_if_active_has_a_single_winner() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .create(&new_session(1, "contended", t0() + Duration::days(7)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.revoke_if_active("contended", t0()).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn rotate_revokes_and_inserts_together() {
        let store = MemorySessionStore::new();
        store
            .create(&new_session(1, "gen-1", t0() + Duration::days(7)))
            .await
            .unwrap();

        let successor = store
            .rotate("gen-1", &new_session(1, "gen-2", t0() + Duration::days(7)), t0())
            .await
            .unwrap()
            .expect("active session should rotate");
        assert_eq!(successor.token_id, "gen-2");
        assert!(successor.revoked_at.is_none());

        let consumed = store.find_by_token_id("gen-1").await.unwrap().unwrap();
        assert_eq!(consumed.revoked_at, Some(t0()));

        // A consumed session cannot be rotated again and nothing is written.
        let again = store
            .rotate("gen-1", &new_session(1, "gen-3", t0() + Duration::days(7)), t0())
            .await
            .unwrap();
        assert!(again.is_none());
        assert!(store.find_by_token_id("gen-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotate_with_duplicate_successor_changes_nothing() {
        let store = MemorySessionStore::new();
        for token in ["gen-1", "taken"] {
            store
                .create(&new_session(1, token, t0() + Duration::days(7)))
                .await
                .unwrap();
        }

        let result = store
            .rotate("gen-1", &new_session(1, "taken", t0() + Duration::days(7)), t0())
            .await;
        assert!(result.is_err());
        assert!(store.find_active_by_token_id("gen-1", t0()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_rotate_has_a_single_winner() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .create(&new_session(1, "contended", t0() + Duration::days(7)))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let next = new_session(1, &format!("next-{i}"), t0() + Duration::days(7));
                store.rotate("contended", &next, t0()).await.unwrap().is_some()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.count_active_for_user(1, t0()), 1);
    }

    #[tokio::test]
    async fn touch_bumps_only_active_sessions_forward() {
        let store = MemorySessionStore::new();
        store
            .create(&new_session(1, "live", t0() + Duration::days(7)))
            .await
            .unwrap();
        store
            .create(&new_session(1, "revoked", t0() + Duration::days(7)))
            .await
            .unwrap();
        store.revoke_by_token_id("revoked", t0()).await.unwrap();

        let later = t0() + Duration::minutes(30);
        assert!(store.touch("live", later).await.unwrap());
        assert!(!store.touch("live", t0()).await.unwrap(), "never moves backwards");
        assert!(!store.touch("revoked", later).await.unwrap());
        assert!(!store.touch("unknown", later).await.unwrap());

        let row = store.find_by_token_id("live").await.unwrap().unwrap();
        assert_eq!(row.last_activity, later);
        assert_eq!(row.created_at, t0());
    }

    #[tokio::test]
    async fn revoke_for_user_by_id_checks_ownership() {
        let store = MemorySessionStore::new();
        let session = store
            .create(&new_session(1, "mine", t0() + Duration::days(7)))
            .await
            .unwrap();

        assert!(!store.revoke_for_user_by_id(2, session.id, t0()).await.unwrap());
        assert!(store.revoke_for_user_by_id(1, session.id, t0()).await.unwrap());
        assert!(!store.revoke_for_user_by_id(1, session.id, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn list_active_orders_by_recent_activity() {
        let store = MemorySessionStore::new();
        let mut older = new_session(1, "older", t0() + Duration::days(7));
        older.created_at = t0() - Duration::hours(1);
        store.create(&older).await.unwrap();
        store
            .create(&new_session(1, "newer", t0() + Duration::days(7)))
            .await
            .unwrap();
        store
            .create(&new_session(2, "someone-else", t0() + Duration::days(7)))
            .await
            .unwrap();

        let listed = store.list_active_for_user(1, t0()).await.unwrap();
        let tokens: Vec<&str> = listed.iter().map(|s| s.token_id.as_str()).collect();
        assert_eq!(tokens, ["newer", "older"]);
    }

    #[tokio::test]
    async fn prune_only_removes_past_expiry() {
        let store = MemorySessionStore::new();
        store
            .create(&new_session(1, "past", t0() - Duration::hours(1)))
            .await
            .unwrap();
        store
            .create(&new_session(1, "future", t0() + Duration::weeks(1)))
            .await
            .unwrap();
        store
            .create(&new_session(1, "future-revoked", t0() + Duration::weeks(1)))
            .await
            .unwrap();
        store.revoke_by_token_id("future-revoked", t0()).await.unwrap();

        assert_eq!(store.prune_expired(t0()).await.unwrap(), 1);
        let remaining: Vec<String> = store.all().into_iter().map(|s| s.token_id).collect();
        assert_eq!(remaining, ["future", "future-revoked"]);

        assert_eq!(store.prune_expired(t0()).await.unwrap(), 0, "prune is idempotent");
    }

    #[tokio::test]
    async fn blacklist_add_is_idempotent_and_prunable() {
        let store = MemoryBlacklistStore::new();
        let entry = CreateBlacklistEntry {
            token_id: "jti-1".into(),
            user_id: 1,
            expires_at: t0() + Duration::minutes(15),
            reason: "compromised".into(),
            created_at: t0(),
        };

        assert!(store.add(&entry).await.unwrap());
        assert!(!store.add(&entry).await.unwrap());
        assert!(store.exists("jti-1").await.unwrap());
        assert!(!store.exists("jti-2").await.unwrap());

        assert_eq!(store.prune_expired(t0()).await.unwrap(), 0);
        assert_eq!(store.prune_expired(t0() + Duration::minutes(15)).await.unwrap(), 1);
        assert!(!store.exists("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemorySessionStore::new();
        store.set_unavailable(true);
        let err = store.find_by_token_id("any").await.unwrap_err();
        assert!(matches!(err, sqlx::Error::PoolTimedOut));

        store.set_unavailable(false);
        assert!(store.find_by_token_id("any").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_password_stamps_change_time() {
        let store = MemoryUserStore::new(t0());
        let user = store
            .create(&CreateUser {
                email: "u1@example.com".into(),
                role: "user".into(),
                email_verified: true,
                password_hash: "old".into(),
            })
            .await
            .unwrap();
        assert!(user.password_changed_at.is_none());

        let changed = t0() + Duration::days(1);
        assert!(store.update_password(user.id, "new", changed).await.unwrap());
        let reloaded = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.password_hash, "new");
        assert_eq!(reloaded.password_changed_at, Some(changed));
        assert!(!store.update_password(999, "x", changed).await.unwrap());
    }
}
