use anyhow::{Context, Result};
use clap::{builder::BoolishValueParser, Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::auth::{
    refresh_token::{DEFAULT_REFRESH_TTL_SECONDS, MAX_REFRESH_TTL_SECONDS},
    session_token::{DEFAULT_SESSION_TTL_SECONDS, MAX_SESSION_TTL_SECONDS},
};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_SERVICE_API_KEY: &str = "service-api-key";
pub const ARG_PLATFORM: &str = "platform";
pub const ARG_SESSION_TTL: &str = "session-ttl-seconds";
pub const ARG_REFRESH_TTL: &str = "refresh-ttl-seconds";
pub const ARG_LEGACY_AUTH_SCHEME: &str = "legacy-auth-scheme";

/// Auth options as parsed from the command line / environment.
#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub service_api_key: SecretString,
    pub platform: String,
    pub session_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
    pub legacy_auth_scheme: bool,
}

impl Options {
    /// # Errors
    /// Returns an error if a required secret is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .cloned()
            .context("missing required argument: --jwt-secret")?;
        let service_api_key = matches
            .get_one::<String>(ARG_SERVICE_API_KEY)
            .cloned()
            .context("missing required argument: --service-api-key")?;

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            service_api_key: SecretString::from(service_api_key),
            platform: matches
                .get_one::<String>(ARG_PLATFORM)
                .cloned()
                .unwrap_or_else(|| "prod".to_string()),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            refresh_ttl_seconds: matches
                .get_one::<i64>(ARG_REFRESH_TTL)
                .copied()
                .unwrap_or(DEFAULT_REFRESH_TTL_SECONDS),
            legacy_auth_scheme: matches.get_flag(ARG_LEGACY_AUTH_SCHEME),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_secret_args(command);
    with_session_args(command)
}

fn with_secret_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 secret used to sign session tokens")
                .env("CHIRPY_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SERVICE_API_KEY)
                .long(ARG_SERVICE_API_KEY)
                .help("API key expected from the payment provider webhook")
                .env("CHIRPY_SERVICE_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_PLATFORM)
                .long(ARG_PLATFORM)
                .help("Deployment platform; only `dev` enables /admin/reset")
                .env("CHIRPY_PLATFORM")
                .default_value("prod"),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Session token lifetime in seconds")
                .env("CHIRPY_SESSION_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL)
                .long(ARG_REFRESH_TTL)
                .help("Refresh token lifetime in seconds")
                .env("CHIRPY_REFRESH_TTL_SECONDS")
                .default_value("5184000")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_REFRESH_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_LEGACY_AUTH_SCHEME)
                .long(ARG_LEGACY_AUTH_SCHEME)
                .help("Accept Authorization values by stripping the scheme name anywhere instead of strict `<scheme> <value>` parsing")
                .env("CHIRPY_LEGACY_AUTH_SCHEME")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
}
