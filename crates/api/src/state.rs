use std::sync::Arc;

use crate::auth::TokenService;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool. `None` when the service runs on in-memory
    /// stores.
    pub pool: Option<warden_db::DbPool>,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// Credential lifecycle operations.
    pub tokens: Arc<TokenService>,
}
