//! Account creation and credential updates.

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

use super::{error_response, json_payload, normalize_email, valid_email};
use crate::{
    auth::{password::hash_blocking, AuthState, Rejection},
    store::{StoreError, Stores, UserRecord},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub is_chirpy_red: bool,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            updated_at: user.updated_at,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

/// Validate and hash submitted credentials, or produce the error response.
async fn prepare_credentials(
    auth_state: &AuthState,
    request: CredentialsRequest,
) -> Result<(String, String), Response> {
    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return Err(error_response(StatusCode::BAD_REQUEST, "Invalid email"));
    }
    if request.password.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Password is required"));
    }

    match hash_blocking(auth_state.hasher(), request.password).await {
        Ok(hashed) => Ok((email, hashed)),
        Err(err) => {
            error!("Failed to hash password: {err}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not hash password",
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Missing payload, invalid email or empty password", body = super::ErrorBody),
        (status = 409, description = "Email already registered", body = super::ErrorBody),
    ),
    tag = "users"
)]
#[instrument(skip(auth_state, stores, payload))]
pub async fn create_user(
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let request = match json_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (email, hashed) = match prepare_credentials(&auth_state, request).await {
        Ok(prepared) => prepared,
        Err(response) => return response,
    };

    match stores.users.create_user(&email, &hashed).await {
        Ok(user) => {
            debug!("Created user {}", user.id);
            (StatusCode::CREATED, Json(UserResponse::from(user))).into_response()
        }
        Err(StoreError::Conflict) => {
            error_response(StatusCode::CONFLICT, "Email already registered")
        }
        Err(err) => {
            error!("Failed to create user: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user")
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/users",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials updated", body = UserResponse),
        (status = 400, description = "Missing payload, invalid email or empty password", body = super::ErrorBody),
        (status = 401, description = "Missing or invalid session token", body = super::ErrorBody),
        (status = 404, description = "User no longer exists", body = super::ErrorBody),
        (status = 409, description = "Email already registered", body = super::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
#[instrument(skip(headers, auth_state, stores, payload))]
pub async fn update_user(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Response {
    let identity = match auth_state.guard().authenticate(&headers) {
        Ok(identity) => identity,
        Err(err) => {
            debug!("Rejected credential update: {err}");
            return Rejection::from(err).into_response();
        }
    };

    let request = match json_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (email, hashed) = match prepare_credentials(&auth_state, request).await {
        Ok(prepared) => prepared,
        Err(response) => return response,
    };

    match stores
        .users
        .update_credentials(*identity.as_uuid(), &email, &hashed)
        .await
    {
        Ok(Some(user)) => (StatusCode::OK, Json(UserResponse::from(user))).into_response(),
        Ok(None) => Rejection::NotFound.into_response(),
        Err(StoreError::Conflict) => {
            error_response(StatusCode::CONFLICT, "Email already registered")
        }
        Err(err) => {
            error!("Failed to update user: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update user")
        }
    }
}
