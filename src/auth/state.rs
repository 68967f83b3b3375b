use chrono::Duration;
use std::sync::Arc;

use super::{
    AuthConfig, AuthGuard, PasswordHasher, RefreshTokenManager, SessionTokenCodec,
};
use crate::store::RefreshTokenStore;

/// Everything the HTTP layer needs to authenticate requests, built once from
/// [`AuthConfig`] and shared read-only.
#[derive(Clone, Debug)]
pub struct AuthState {
    config: AuthConfig,
    codec: SessionTokenCodec,
    refresh: RefreshTokenManager,
    guard: AuthGuard,
    hasher: PasswordHasher,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        refresh_store: Arc<dyn RefreshTokenStore>,
        hasher: PasswordHasher,
    ) -> Self {
        let codec = SessionTokenCodec::new(
            config.jwt_secret().clone(),
            Duration::seconds(config.session_ttl_seconds()),
        );
        let refresh = RefreshTokenManager::new(
            refresh_store,
            Duration::seconds(config.refresh_ttl_seconds()),
        );
        let guard = AuthGuard::new(
            codec.clone(),
            config.service_api_key().clone(),
            config.scheme_mode(),
        );
        Self {
            config,
            codec,
            refresh,
            guard,
            hasher,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn codec(&self) -> &SessionTokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn refresh(&self) -> &RefreshTokenManager {
        &self.refresh
    }

    #[must_use]
    pub fn guard(&self) -> &AuthGuard {
        &self.guard
    }

    #[must_use]
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }
}
