//! Password hashing for chatrelay accounts.
//!
//! PBKDF2-HMAC-SHA512 with a fresh 16-byte random salt per account and a
//! 32-byte derived digest. Salt and digest are stored base64-encoded, so the
//! directory store never sees raw bytes.
//!
//! Verification recomputes the digest with the stored salt and compares in
//! constant time. A stored salt or digest that fails to decode verifies as
//! `false` rather than erroring; the caller only ever needs yes or no.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::Hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Iteration floor. Configured values below this are raised to it.
pub const MIN_ITERATIONS: u32 = 100_000;
/// Password length floor. Configured values below this are raised to it.
pub const MIN_PASSWORD_LEN: usize = 8;
pub const SALT_LEN: usize = 16;
pub const DIGEST_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("key derivation failed: {0}")]
    Derivation(String),
}

/// Salt and digest as persisted alongside an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub salt: String,
    pub digest: String,
}

/// Credential hashing seam used by the dispatcher.
pub trait Authenticator: Send + Sync {
    /// Hash `password` under a freshly generated salt.
    fn hash(&self, password: &str) -> Result<PasswordHash, AuthError>;

    /// True if `password` derives to `digest` under `salt`.
    fn verify(&self, password: &str, salt: &str, digest: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct Pbkdf2Authenticator {
    iterations: u32,
}

impl Pbkdf2Authenticator {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(MIN_ITERATIONS),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn derive(&self, password: &str, salt: &[u8]) -> Result<[u8; DIGEST_LEN], AuthError> {
        let mut out = [0u8; DIGEST_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha512>>(password.as_bytes(), salt, self.iterations, &mut out)
            .map_err(|e| AuthError::Derivation(e.to_string()))?;
        Ok(out)
    }
}

impl Default for Pbkdf2Authenticator {
    fn default() -> Self {
        Self::new(MIN_ITERATIONS)
    }
}

impl Authenticator for Pbkdf2Authenticator {
    fn hash(&self, password: &str) -> Result<PasswordHash, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let digest = self.derive(password, &salt)?;
        Ok(PasswordHash {
            salt: STANDARD.encode(salt),
            digest: STANDARD.encode(digest),
        })
    }

    fn verify(&self, password: &str, salt: &str, digest: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(digest)) else {
            return false;
        };
        if expected.len() != DIGEST_LEN {
            return false;
        }
        match self.derive(password, &salt) {
            Ok(actual) => actual[..].ct_eq(&expected[..]).unwrap_u8() == 1,
            Err(e) => {
                tracing::warn!(error = %e, "password verification could not derive key");
                false
            }
        }
    }
}
