//! Session authentication and authorization core.
//!
//! Flow Overview:
//! 1) Credential extractors pull a bearer token or service key from the
//!    `Authorization` header.
//! 2) Session tokens are HS256 JWTs verified against the process-wide secret.
//! 3) Refresh tokens are opaque random strings persisted with an expiry and an
//!    optional revocation time; redeeming one mints a fresh session token.
//! 4) The guard compares the authenticated identity against the owner recorded
//!    on the resource before a mutation is allowed.
//!
//! ## Failure Collapse
//!
//! Every internal failure kind is mapped to one of four public outcomes in
//! [`guard`]: 401, 403, 404 or an opaque 500. Response bodies never say whether
//! a token expired, was signed with another secret or was malformed.
//!
//! ## Refresh Token Reuse
//!
//! Refresh tokens are not rotated on use. A token stays valid until it expires
//! or is revoked, so a leaked refresh token can mint session tokens for its
//! whole lifetime.

pub mod config;
pub mod credentials;
mod error;
pub mod guard;
pub mod password;
pub mod refresh_token;
pub mod session_token;
mod state;

pub use config::{AuthConfig, Platform};
pub use credentials::SchemeMode;
pub use error::AuthError;
pub use guard::{AuthGuard, Rejection};
pub use password::PasswordHasher;
pub use refresh_token::RefreshTokenManager;
pub use session_token::SessionTokenCodec;
pub use state::AuthState;

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Subject identity carried by session tokens and recorded as resource owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Uuid);

impl Identity {
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Identity {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<Identity> for Uuid {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Identity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
