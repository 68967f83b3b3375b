use crate::{
    api,
    auth::{AuthConfig, Platform, SchemeMode},
};
use anyhow::Result;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub static_dir: PathBuf,
    pub jwt_secret: SecretString,
    pub service_api_key: SecretString,
    pub platform: String,
    pub session_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub legacy_auth_scheme: bool,
}

impl Args {
    /// Immutable auth configuration shared by every request.
    #[must_use]
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.jwt_secret.clone(), self.service_api_key.clone())
            .with_platform(Platform::parse(&self.platform))
            .with_session_ttl_seconds(self.session_ttl_seconds)
            .with_refresh_ttl_seconds(self.refresh_ttl_seconds)
            .with_scheme_mode(SchemeMode::from_legacy_flag(self.legacy_auth_scheme))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = args.auth_config();
    debug!("Auth config: {:?}", auth_config);

    api::new(args.port, args.dsn, auth_config, &args.static_dir).await
}
