//! Map validated CLI arguments to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_DSN, ARG_PORT, ARG_STATIC_DIR};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let static_dir = matches
        .get_one::<String>(ARG_STATIC_DIR)
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        static_dir,
        jwt_secret: auth_opts.jwt_secret,
        service_api_key: auth_opts.service_api_key,
        platform: auth_opts.platform,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        refresh_ttl_seconds: auth_opts.refresh_ttl_seconds,
        legacy_auth_scheme: auth_opts.legacy_auth_scheme,
    }))
}
