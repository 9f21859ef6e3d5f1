//! Warden API server library.
//!
//! Exposes the token service, HTTP adapter, config, and error handling so
//! integration tests and the binary entrypoint can both access them.

pub mod auth;
pub mod config;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
