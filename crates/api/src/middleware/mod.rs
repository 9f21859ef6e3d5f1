//! Request extractors for authentication, authorization, and client metadata.
//!
//! - [`auth::AuthUser`] -- Authenticated caller from a Bearer access token.
//! - [`auth::MaybeAuthUser`] -- Same, but `None` instead of a 401.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`device::ClientDevice`] -- Device metadata for new sessions.

pub mod auth;
pub mod device;
pub mod rbac;
