//! Route handlers and the small helpers they share.

pub mod admin;
pub mod chirps;
pub mod health;
pub mod login;
pub mod users;
pub mod webhooks;

pub use admin::SiteState;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Unwrap a JSON payload. Handlers extract the body as a `Result` and call this
/// only after any credential check, so a missing or malformed body on a guarded
/// route still answers 401 first.
pub(crate) fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(rejection) => {
            debug!("Rejected payload: {rejection}");
            Err(error_response(StatusCode::BAD_REQUEST, "Missing or invalid payload"))
        }
    }
}

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
