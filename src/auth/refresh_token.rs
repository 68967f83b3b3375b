//! Opaque refresh tokens.
//!
//! A refresh token is 32 bytes from the OS RNG, hex encoded. The raw value is
//! the primary key in storage; there is nothing to decode.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use tracing::debug;

use super::{AuthError, Identity};
use crate::store::{RefreshTokenRecord, RefreshTokenStore};

pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 60 * 24 * 60 * 60;
/// Upper bound accepted from configuration (one year).
pub const MAX_REFRESH_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;
const TOKEN_BYTES: usize = 32;

/// Generate a fresh 64-character hex token.
///
/// # Errors
/// Returns [`AuthError::Entropy`] if the OS RNG fails.
pub fn generate() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| AuthError::Entropy(err.to_string()))?;
    Ok(hex::encode(bytes))
}

#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    ttl: Duration,
}

impl RefreshTokenManager {
    #[must_use]
    pub fn new(store: Arc<dyn RefreshTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create and persist a new token owned by `identity`.
    ///
    /// # Errors
    /// [`AuthError::LifetimeOverflow`], [`AuthError::Entropy`] or
    /// [`AuthError::StorageFailure`].
    pub async fn issue(&self, identity: Identity) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::LifetimeOverflow)?;
        let token = generate()?;
        self.store
            .insert(RefreshTokenRecord {
                token: token.clone(),
                user_id: identity.into(),
                created_at: now,
                updated_at: now,
                expires_at,
                revoked_at: None,
            })
            .await?;
        Ok(token)
    }

    /// Resolve a token to its owner if it is still usable.
    ///
    /// The token is not consumed: it can be redeemed again until it expires or
    /// is revoked.
    ///
    /// # Errors
    /// [`AuthError::RefreshTokenNotFound`], [`AuthError::RefreshTokenRevoked`],
    /// [`AuthError::RefreshTokenExpired`] or [`AuthError::StorageFailure`].
    pub async fn redeem(&self, token: &str) -> Result<Identity, AuthError> {
        self.redeem_at(token, Utc::now()).await
    }

    pub(crate) async fn redeem_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        let record = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(AuthError::RefreshTokenNotFound)?;

        if record.revoked_at.is_some() {
            return Err(AuthError::RefreshTokenRevoked);
        }
        if record.expires_at <= now {
            return Err(AuthError::RefreshTokenExpired);
        }

        self.store.touch(token, now).await?;
        Ok(Identity::from(record.user_id))
    }

    /// Revoke a token. Revoking twice, or revoking an unknown token, succeeds.
    ///
    /// # Errors
    /// [`AuthError::StorageFailure`].
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        if !self.store.set_revoked(token, Utc::now()).await? {
            debug!("revoke requested for unknown refresh token");
        }
        Ok(())
    }
}

impl std::fmt::Debug for RefreshTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenManager")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
