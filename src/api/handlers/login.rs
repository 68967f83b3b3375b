//! Password login and the refresh token endpoints.
//!
//! Flow Overview:
//! 1) `/api/login` checks the password and returns a session token plus a
//!    freshly persisted refresh token.
//! 2) `/api/refresh` exchanges a live refresh token (bearer) for a new session
//!    token. The refresh token itself is left unchanged.
//! 3) `/api/revoke` marks a refresh token revoked; it always answers 204 once a
//!    credential was presented.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{error_response, json_payload, normalize_email};
use crate::{
    auth::{
        credentials::extract_bearer,
        password::{verify_blocking, verify_decoy_blocking},
        AuthError, AuthState, Identity, Rejection,
    },
    store::Stores,
};

const LOGIN_FAILED: &str = "Incorrect email or password";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
    pub is_chirpy_red: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session and refresh token issued", body = LoginResponse),
        (status = 400, description = "Missing or invalid payload", body = super::ErrorBody),
        (status = 401, description = "Incorrect email or password", body = super::ErrorBody),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, stores, payload))]
pub async fn login(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match json_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let email = normalize_email(&request.email);

    let user = match stores.users.find_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("Login for unknown email");
            // Same Argon2 work as a wrong password.
            let _ = verify_decoy_blocking(auth_state.hasher(), request.password).await;
            return error_response(StatusCode::UNAUTHORIZED, LOGIN_FAILED);
        }
        Err(err) => return Rejection::from(AuthError::from(err)).into_response(),
    };

    if let Err(err) = verify_blocking(
        auth_state.hasher(),
        request.password,
        user.hashed_password.clone(),
    )
    .await
    {
        debug!("Login rejected: {err}");
        return error_response(StatusCode::UNAUTHORIZED, LOGIN_FAILED);
    }

    let identity = Identity::from(user.id);
    let token = match auth_state.codec().issue(identity) {
        Ok(token) => token,
        Err(err) => return Rejection::from(err).into_response(),
    };
    let refresh_token = match auth_state.refresh().issue(identity).await {
        Ok(token) => token,
        Err(err) => return Rejection::from(err).into_response(),
    };

    let response = LoginResponse {
        id: user.id,
        created_at: user.created_at,
        updated_at: user.updated_at,
        email: user.email,
        token,
        refresh_token,
        is_chirpy_red: user.is_chirpy_red,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "New session token", body = TokenResponse),
        (status = 401, description = "Missing, unknown, revoked or expired refresh token", body = super::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(headers, auth_state))]
pub async fn refresh(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> Response {
    match exchange_refresh_token(&auth_state, &headers).await {
        Ok(token) => (StatusCode::OK, Json(TokenResponse { token })).into_response(),
        Err(err) => {
            debug!("Refresh rejected: {err}");
            Rejection::from(err).into_response()
        }
    }
}

async fn exchange_refresh_token(
    auth_state: &AuthState,
    headers: &HeaderMap,
) -> Result<String, AuthError> {
    let presented = extract_bearer(headers, auth_state.config().scheme_mode())?;
    let identity = auth_state.refresh().redeem(&presented).await?;
    auth_state.codec().issue(identity)
}

#[utoipa::path(
    post,
    path = "/api/revoke",
    responses(
        (status = 204, description = "Refresh token revoked"),
        (status = 401, description = "No refresh token presented", body = super::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(headers, auth_state))]
pub async fn revoke(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> Response {
    let presented = match extract_bearer(&headers, auth_state.config().scheme_mode()) {
        Ok(token) => token,
        Err(err) => return Rejection::from(err).into_response(),
    };

    match auth_state.refresh().revoke(&presented).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to revoke refresh token: {err}");
            Rejection::from(err).into_response()
        }
    }
}
