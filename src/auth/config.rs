//! Process-wide auth configuration.
//!
//! Built once at start-up from CLI/env values and injected into every component;
//! nothing here is mutated after the server starts.

use secrecy::SecretString;
use std::fmt;

use super::credentials::SchemeMode;
use super::refresh_token::{DEFAULT_REFRESH_TTL_SECONDS, MAX_REFRESH_TTL_SECONDS};
use super::session_token::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS};

/// Deployment platform; only `dev` unlocks destructive maintenance routes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Platform {
    Dev,
    #[default]
    Prod,
}

impl Platform {
    /// Anything other than `dev` is treated as production.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("dev") {
            Self::Dev
        } else {
            Self::Prod
        }
    }

    #[must_use]
    pub const fn allows_reset(self) -> bool {
        matches!(self, Self::Dev)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dev => f.write_str("dev"),
            Self::Prod => f.write_str("prod"),
        }
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: SecretString,
    service_api_key: SecretString,
    platform: Platform,
    session_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    scheme_mode: SchemeMode,
}

impl AuthConfig {
    #[must_use]
    pub fn new(jwt_secret: SecretString, service_api_key: SecretString) -> Self {
        Self {
            jwt_secret,
            service_api_key,
            platform: Platform::default(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            scheme_mode: SchemeMode::Strict,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Clamped to `1..=MAX_SESSION_TTL_SECONDS`.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds.clamp(1, MAX_SESSION_TTL_SECONDS);
        self
    }

    /// Clamped to `1..=MAX_REFRESH_TTL_SECONDS`.
    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds.clamp(1, MAX_REFRESH_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn with_scheme_mode(mut self, mode: SchemeMode) -> Self {
        self.scheme_mode = mode;
        self
    }

    #[must_use]
    pub fn jwt_secret(&self) -> &SecretString {
        &self.jwt_secret
    }

    #[must_use]
    pub fn service_api_key(&self) -> &SecretString {
        &self.service_api_key
    }

    #[must_use]
    pub const fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub const fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub const fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub const fn scheme_mode(&self) -> SchemeMode {
        self.scheme_mode
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("service_api_key", &"***")
            .field("platform", &self.platform)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .field("scheme_mode", &self.scheme_mode)
            .finish()
    }
}
