//! Repository layer.
//!
//! Each store is an object-safe async trait; the `Pg*` structs implement it
//! against PostgreSQL and [`crate::memory`] provides in-process doubles.

pub mod blacklist_repo;
pub mod session_repo;
pub mod user_repo;

pub use blacklist_repo::{BlacklistStore, PgBlacklistStore};
pub use session_repo::{PgSessionStore, SessionStore};
pub use user_repo::{PgUserStore, UserStore};
