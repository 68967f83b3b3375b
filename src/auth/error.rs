use thiserror::Error;

use super::password::PasswordError;
use crate::store::StoreError;

/// Internal failure kinds for the auth core.
///
/// These never reach a client verbatim; [`super::guard::Rejection::from`] is the
/// single place they are collapsed into a public status.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing credential")]
    MissingCredential,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token signature")]
    TokenSignatureInvalid,
    #[error("malformed token: {0}")]
    TokenMalformed(String),
    #[error("refresh token revoked")]
    RefreshTokenRevoked,
    #[error("refresh token not found")]
    RefreshTokenNotFound,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error("api key mismatch")]
    ApiKeyMismatch,
    #[error("identity does not own the resource")]
    OwnershipMismatch,
    #[error("resource not found")]
    ResourceNotFound,
    #[error("token lifetime overflows the clock")]
    LifetimeOverflow,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("failed to generate refresh token: {0}")]
    Entropy(String),
    #[error("password hashing failed: {0}")]
    Hashing(#[from] PasswordError),
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StoreError),
}
