//! HS256 session tokens.
//!
//! Claim set is deliberately minimal: `iss`, `sub`, `iat`, `exp`. There is no
//! audience or not-before claim, and the issuer is only required to be present.
//! An empty secret is accepted and still signs/verifies consistently.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{AuthError, Identity};

pub const TOKEN_ISSUER: &str = "chirpy";
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 60 * 60;
/// Upper bound accepted from configuration (30 days).
pub const MAX_SESSION_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a session token for `identity` valid for `ttl` from now.
///
/// # Errors
/// Returns [`AuthError::LifetimeOverflow`] if `now + ttl` is not representable
/// and [`AuthError::Signing`] if the claims cannot be encoded.
pub fn issue(identity: Identity, secret: &[u8], ttl: Duration) -> Result<String, AuthError> {
    issue_at(identity, secret, ttl, Utc::now())
}

/// Verify a session token and return its subject.
///
/// # Errors
/// Returns [`AuthError::TokenSignatureInvalid`], [`AuthError::TokenExpired`] or
/// [`AuthError::TokenMalformed`].
pub fn verify(token: &str, secret: &[u8]) -> Result<Identity, AuthError> {
    verify_at(token, secret, Utc::now())
}

pub(crate) fn issue_at(
    identity: Identity,
    secret: &[u8],
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let expires_at = now
        .checked_add_signed(ttl)
        .ok_or(AuthError::LifetimeOverflow)?;
    let claims = SessionClaims {
        iss: TOKEN_ISSUER.to_string(),
        sub: identity.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|err| AuthError::Signing(err.to_string()))
}

pub(crate) fn verify_at(
    token: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<Identity, AuthError> {
    // Expiry is checked below against `now` so the boundary is strict and testable.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);

    let data = decode::<SessionClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|err| match err.kind() {
            ErrorKind::InvalidSignature => AuthError::TokenSignatureInvalid,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenMalformed(err.to_string()),
        })?;

    let claims = data.claims;
    if claims.exp <= now.timestamp() {
        return Err(AuthError::TokenExpired);
    }

    claims
        .sub
        .parse::<Identity>()
        .map_err(|_| AuthError::TokenMalformed("subject is not a valid identity".to_string()))
}

/// Codec bound to the process-wide signing secret and default TTL.
#[derive(Clone)]
pub struct SessionTokenCodec {
    secret: SecretString,
    ttl: Duration,
}

impl SessionTokenCodec {
    #[must_use]
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token with the configured TTL.
    ///
    /// # Errors
    /// See [`issue`].
    pub fn issue(&self, identity: Identity) -> Result<String, AuthError> {
        issue(identity, self.secret.expose_secret().as_bytes(), self.ttl)
    }

    /// # Errors
    /// See [`verify`].
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        verify(token, self.secret.expose_secret().as_bytes())
    }

    #[cfg(test)]
    pub(crate) fn issue_at(&self, identity: Identity, now: DateTime<Utc>) -> Result<String, AuthError> {
        issue_at(identity, self.secret.expose_secret().as_bytes(), self.ttl, now)
    }

    #[cfg(test)]
    pub(crate) fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        verify_at(token, self.secret.expose_secret().as_bytes(), now)
    }
}

impl std::fmt::Debug for SessionTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenCodec")
            .field("secret", &"***")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn issued_token_verifies_with_same_secret() {
        let identity = Identity::new_random();
        let token = issue(identity, b"your-test-secret", Duration::hours(1)).unwrap();
        assert!(!token.is_empty());
        assert_eq!(verify(&token, b"your-test-secret").unwrap(), identity);
    }

    #[test]
    fn different_secret_is_rejected() {
        let token = issue(Identity::new_random(), b"original-secret", Duration::hours(1)).unwrap();
        assert!(matches!(
            verify(&token, b"wrong-secret"),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn already_expired_token_is_rejected() {
        let token = issue(Identity::new_random(), b"test-secret", Duration::hours(-1)).unwrap();
        assert!(matches!(
            verify(&token, b"test-secret"),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn token_is_expired_exactly_at_expiry_instant() {
        let identity = Identity::new_random();
        let issued = Utc::now();
        let token = issue_at(identity, b"s", Duration::seconds(30), issued).unwrap();

        let just_before = issued + Duration::seconds(29);
        assert_eq!(verify_at(&token, b"s", just_before).unwrap(), identity);

        let at_expiry = issued + Duration::seconds(30);
        assert!(matches!(
            verify_at(&token, b"s", at_expiry),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            verify("not-a-valid-jwt", b"any-secret"),
            Err(AuthError::TokenMalformed(_))
        ));
    }

    #[test]
    fn nil_identity_round_trips() {
        let nil = Identity::from_uuid(Uuid::nil());
        let token = issue(nil, b"test-secret", Duration::hours(1)).unwrap();
        assert_eq!(verify(&token, b"test-secret").unwrap(), nil);
    }

    #[test]
    fn empty_secret_is_consistent_but_not_interchangeable() {
        let identity = Identity::new_random();
        let token = issue(identity, b"", Duration::hours(1)).unwrap();
        assert_eq!(verify(&token, b"").unwrap(), identity);
        assert!(verify(&token, b"some-secret").is_err());
    }

    #[test]
    fn claims_carry_issuer_and_ttl() {
        let identity = Identity::new_random();
        let now = Utc::now();
        let token = issue_at(identity, b"k", Duration::hours(24), now).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = decode::<SessionClaims>(&token, &DecodingKey::from_secret(b"k"), &validation)
            .unwrap()
            .claims;
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.sub, identity.to_string());
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn non_uuid_subject_is_malformed() {
        let claims = SessionClaims {
            iss: TOKEN_ISSUER.to_string(),
            sub: "alice".to_string(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        assert!(matches!(
            verify(&token, b"k"),
            Err(AuthError::TokenMalformed(_))
        ));
    }

    #[test]
    fn codec_uses_its_own_secret_and_ttl() {
        let codec = SessionTokenCodec::new(SecretString::from("codec-secret".to_string()), Duration::minutes(5));
        let identity = Identity::new_random();
        let now = Utc::now();
        let token = codec.issue_at(identity, now).unwrap();
        assert_eq!(codec.verify_at(&token, now).unwrap(), identity);
        assert!(codec
            .verify_at(&token, now + Duration::minutes(5))
            .is_err());
        assert_eq!(codec.verify(&codec.issue(identity).unwrap()).unwrap(), identity);
        assert!(!format!("{codec:?}").contains("codec-secret"));
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        assert!(matches!(
            issue(Identity::new_random(), b"k", Duration::MAX),
            Err(AuthError::LifetimeOverflow)
        ));
    }
}
