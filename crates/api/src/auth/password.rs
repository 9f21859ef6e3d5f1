//! Argon2id hashing for passwords and refresh credentials.
//!
//! All hashes use the Argon2id variant with a cryptographically random salt
//! generated via [`OsRng`]. The PHC string format is used for storage so that
//! algorithm parameters and salt are embedded in the hash itself; verification
//! always uses the parameters recorded in the stored hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Minimum password length accepted on password change.
pub const MIN_PASSWORD_LENGTH: usize = 12;

/// Salted, deliberately slow one-way hasher.
///
/// The same hasher is used for user passwords and for the raw refresh
/// credential stored (hashed) on each session row.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
}

impl Default for SecretHasher {
    /// Argon2id with the crate's default (OWASP-recommended) parameters.
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl SecretHasher {
    /// Argon2id with explicit cost parameters.
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a secret with a random salt, returning the PHC string.
    pub fn hash(&self, secret: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2.hash_password(secret.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Verify a secret against a stored PHC-formatted Argon2id hash.
    ///
    /// Returns `Ok(true)` on match, `Ok(false)` on mismatch, and `Err` only
    /// if the stored hash is malformed.
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;
        match self.argon2.verify_password(secret.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Validate that a password meets minimum strength requirements.
///
/// Currently enforces a minimum character length. Returns `Ok(())` when the
/// password is acceptable, or `Err` with a human-readable explanation.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    Ok(())
}
