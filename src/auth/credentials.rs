//! `Authorization` header parsing for bearer tokens and service API keys.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::AuthError;

pub const BEARER_SCHEME: &str = "Bearer";
pub const API_KEY_SCHEME: &str = "ApiKey";

/// How the scheme prefix of an `Authorization` header is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemeMode {
    /// `<scheme> <credential>`, scheme matched case-insensitively. Any other
    /// scheme or a bare value is rejected.
    #[default]
    Strict,
    /// Drops the first literal occurrence of the scheme name, trims, and keeps
    /// whatever is left. Unprefixed values pass through unchanged.
    Legacy,
}

impl SchemeMode {
    #[must_use]
    pub const fn from_legacy_flag(legacy: bool) -> Self {
        if legacy {
            Self::Legacy
        } else {
            Self::Strict
        }
    }
}

/// Extract a bearer credential (session or refresh token).
///
/// # Errors
/// Returns [`AuthError::MissingCredential`] when no usable credential is present.
pub fn extract_bearer(headers: &HeaderMap, mode: SchemeMode) -> Result<String, AuthError> {
    extract(headers, BEARER_SCHEME, mode)
}

/// Extract a service API key.
///
/// # Errors
/// Returns [`AuthError::MissingCredential`] when no usable credential is present.
pub fn extract_api_key(headers: &HeaderMap, mode: SchemeMode) -> Result<String, AuthError> {
    extract(headers, API_KEY_SCHEME, mode)
}

fn extract(headers: &HeaderMap, scheme: &str, mode: SchemeMode) -> Result<String, AuthError> {
    // Non-visible-ASCII header values are treated as absent.
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let credential = match mode {
        SchemeMode::Strict => parse_scheme(value, scheme),
        SchemeMode::Legacy => strip_first_occurrence(value, scheme),
    };

    credential.ok_or(AuthError::MissingCredential)
}

fn parse_scheme(value: &str, scheme: &str) -> Option<String> {
    let (name, rest) = value
        .trim()
        .split_once(|c: char| c.is_ascii_whitespace())?;
    if !name.eq_ignore_ascii_case(scheme) {
        return None;
    }
    non_empty(rest)
}

fn strip_first_occurrence(value: &str, scheme: &str) -> Option<String> {
    non_empty(&value.replacen(scheme, "", 1))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
