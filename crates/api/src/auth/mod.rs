//! Credential lifecycle: issuance, validation, rotation, and revocation.
//!
//! - [`jwt`] -- claim types, signing keys, and token id generation.
//! - [`password`] -- Argon2id hashing for passwords and refresh credentials.
//! - [`service`] -- [`TokenService`], the single entry point for callers.
//! - [`issuer`], [`validator`], [`rotation`] -- the service's core flows.

pub mod error;
pub mod issuer;
pub mod jwt;
pub mod password;
pub mod rotation;
pub mod service;
pub mod validator;

pub use error::AuthError;
pub use service::{AuthenticatedRequest, CleanupReport, IssuedPair, TokenService, TokenStores};
