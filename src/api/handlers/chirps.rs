//! Chirp CRUD. Creation needs a session; deletion also needs ownership.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{error_response, json_payload};
use crate::{
    auth::{AuthError, AuthState, Rejection},
    store::{PostRecord, Stores},
};

pub const MAX_CHIRP_LENGTH: usize = 140;
const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const MASK: &str = "****";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateChirpRequest {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChirpResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

impl From<PostRecord> for ChirpResponse {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            created_at: post.created_at,
            updated_at: post.updated_at,
            body: post.body,
            user_id: post.user_id,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListChirpsQuery {
    /// Only chirps by this author.
    pub author_id: Option<String>,
    /// `asc` (default) or `desc` by creation time.
    pub sort: Option<String>,
}

/// Mask profane words. Words are space separated and matched case-insensitively.
pub(crate) fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            let lowered = word.to_lowercase();
            if PROFANE_WORDS.contains(&lowered.as_str()) {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_chirp_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid chirp id"))
}

#[utoipa::path(
    post,
    path = "/api/chirps",
    request_body = CreateChirpRequest,
    responses(
        (status = 201, description = "Chirp created", body = ChirpResponse),
        (status = 400, description = "Missing payload or chirp too long", body = super::ErrorBody),
        (status = 401, description = "Missing or invalid session token", body = super::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "chirps"
)]
#[instrument(skip(headers, auth_state, stores, payload))]
pub async fn create_chirp(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
    payload: Result<Json<CreateChirpRequest>, JsonRejection>,
) -> Response {
    let identity = match auth_state.guard().authenticate(&headers) {
        Ok(identity) => identity,
        Err(err) => {
            debug!("Rejected chirp creation: {err}");
            return Rejection::from(err).into_response();
        }
    };

    let request = match json_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    if request.body.chars().count() > MAX_CHIRP_LENGTH {
        return error_response(StatusCode::BAD_REQUEST, "Chirp is too long");
    }

    let body = clean_body(&request.body);
    match stores.posts.create(*identity.as_uuid(), &body).await {
        Ok(post) => (StatusCode::CREATED, Json(ChirpResponse::from(post))).into_response(),
        Err(err) => {
            error!("Failed to create chirp: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create chirp")
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/chirps",
    params(ListChirpsQuery),
    responses(
        (status = 200, description = "Chirps ordered by creation time", body = [ChirpResponse]),
        (status = 400, description = "Invalid author id", body = super::ErrorBody),
    ),
    tag = "chirps"
)]
#[instrument(skip(stores))]
pub async fn list_chirps(
    Query(query): Query<ListChirpsQuery>,
    Extension(stores): Extension<Stores>,
) -> Response {
    let author = match query.author_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(author) => Some(author),
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid author id"),
        },
    };

    match stores.posts.list(author).await {
        Ok(posts) => {
            let mut chirps: Vec<ChirpResponse> = posts.into_iter().map(ChirpResponse::from).collect();
            if query.sort.as_deref() == Some("desc") {
                chirps.reverse();
            }
            (StatusCode::OK, Json(chirps)).into_response()
        }
        Err(err) => {
            error!("Failed to list chirps: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list chirps")
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/chirps/{chirp_id}",
    params(
        ("chirp_id" = String, Path, description = "Chirp id")
    ),
    responses(
        (status = 200, description = "Chirp", body = ChirpResponse),
        (status = 400, description = "Invalid chirp id", body = super::ErrorBody),
        (status = 404, description = "Chirp not found", body = super::ErrorBody),
    ),
    tag = "chirps"
)]
#[instrument(skip(stores))]
pub async fn get_chirp(
    Path(chirp_id): Path<String>,
    Extension(stores): Extension<Stores>,
) -> Response {
    let id = match parse_chirp_id(&chirp_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match stores.posts.get(id).await {
        Ok(Some(post)) => (StatusCode::OK, Json(ChirpResponse::from(post))).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Chirp not found"),
        Err(err) => {
            error!("Failed to fetch chirp: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch chirp")
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/chirps/{chirp_id}",
    params(
        ("chirp_id" = String, Path, description = "Chirp id")
    ),
    responses(
        (status = 204, description = "Chirp deleted"),
        (status = 400, description = "Invalid chirp id", body = super::ErrorBody),
        (status = 401, description = "Missing or invalid session token", body = super::ErrorBody),
        (status = 403, description = "Caller is not the author", body = super::ErrorBody),
        (status = 404, description = "Chirp not found", body = super::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "chirps"
)]
#[instrument(skip(headers, auth_state, stores))]
pub async fn delete_chirp(
    Path(chirp_id): Path<String>,
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
) -> Response {
    // 401 wins over a malformed id.
    if let Err(err) = auth_state.guard().authenticate(&headers) {
        debug!("Rejected chirp deletion: {err}");
        return Rejection::from(err).into_response();
    }

    let id = match parse_chirp_id(&chirp_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let identity = match auth_state
        .guard()
        .require_owner(&headers, id, stores.posts.as_ref())
        .await
    {
        Ok(identity) => identity,
        Err(err) => {
            debug!("Rejected chirp deletion: {err}");
            return Rejection::from(err).into_response();
        }
    };

    match stores.posts.delete(id).await {
        Ok(true) => {
            debug!("Chirp {id} deleted by {identity}");
            StatusCode::NO_CONTENT.into_response()
        }
        // Removed concurrently between the ownership check and the delete.
        Ok(false) => Rejection::from(AuthError::ResourceNotFound).into_response(),
        Err(err) => {
            error!("Failed to delete chirp: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete chirp")
        }
    }
}
