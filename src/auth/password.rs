//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$digest`),
//! so verification reads algorithm, cost and salt from the stored value and
//! needs no configuration of its own.

use argon2::{
    password_hash::{self, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
};
use once_cell::sync::OnceCell;
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

const DECOY_PASSWORD: &str = "chirpy-decoy-password";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password does not match")]
    Mismatch,
    #[error("malformed password hash")]
    Malformed,
    #[error("could not hash password: {0}")]
    Hash(String),
}

/// Argon2id hasher with a fixed work factor.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    params: Params,
    // Hash with this hasher's cost, verified against when the account is unknown.
    decoy: Arc<OnceCell<String>>,
}

impl Default for PasswordHasher {
    /// OWASP baseline: m=19456 KiB, t=2, p=1.
    fn default() -> Self {
        Self {
            params: Params::default(),
            decoy: Arc::default(),
        }
    }
}

impl PasswordHasher {
    /// Build a hasher with explicit Argon2 cost parameters.
    ///
    /// # Errors
    /// Returns an error if the parameters are outside Argon2's accepted ranges.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|err| PasswordError::Hash(err.to_string()))?;
        Ok(Self {
            params,
            decoy: Arc::default(),
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    /// Returns [`PasswordError::Hash`] if Argon2 rejects the input.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| PasswordError::Hash(err.to_string()))
    }

    /// Check a password against a stored PHC string.
    ///
    /// # Errors
    /// Returns [`PasswordError::Mismatch`] for a wrong password and
    /// [`PasswordError::Malformed`] when the stored value cannot be parsed.
    pub fn verify(&self, password: &str, hashed: &str) -> Result<(), PasswordError> {
        let parsed = PasswordHash::new(hashed).map_err(|_| PasswordError::Malformed)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(password_hash::Error::Password) => Err(PasswordError::Mismatch),
            Err(_) => Err(PasswordError::Malformed),
        }
    }

    /// Run a full verification against a decoy hash and always report a
    /// mismatch. Used when no stored hash exists, so the response takes as
    /// long as a wrong password would.
    ///
    /// # Errors
    /// Always returns an error: [`PasswordError::Mismatch`], or
    /// [`PasswordError::Hash`] if the decoy could not be produced.
    pub fn verify_decoy(&self, password: &str) -> Result<(), PasswordError> {
        let decoy = self.decoy.get_or_try_init(|| self.hash(DECOY_PASSWORD))?;
        let _ = self.verify(password, decoy);
        Err(PasswordError::Mismatch)
    }
}

/// Hash on the blocking pool so request workers are not stalled by Argon2.
///
/// # Errors
/// Returns an error if hashing fails or the blocking task is cancelled.
pub async fn hash_blocking(hasher: &PasswordHasher, password: String) -> Result<String, PasswordError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|err| PasswordError::Hash(err.to_string()))?
}

/// Verify on the blocking pool.
///
/// # Errors
/// Same as [`PasswordHasher::verify`]; a cancelled task is reported as a mismatch.
pub async fn verify_blocking(
    hasher: &PasswordHasher,
    password: String,
    hashed: String,
) -> Result<(), PasswordError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hashed))
        .await
        .map_err(|_| PasswordError::Mismatch)?
}

/// [`PasswordHasher::verify_decoy`] on the blocking pool.
///
/// # Errors
/// Always returns an error.
pub async fn verify_decoy_blocking(hasher: &PasswordHasher, password: String) -> Result<(), PasswordError> {
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || hasher.verify_decoy(&password))
        .await
        .map_err(|_| PasswordError::Mismatch)?
}
