//! Payment provider webhook, authenticated with the service API key.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{error_response, json_payload};
use crate::{
    auth::{AuthState, Rejection},
    store::Stores,
};

pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WebhookData {
    #[serde(default)]
    pub user_id: String,
}

#[utoipa::path(
    post,
    path = "/api/polka/webhooks",
    request_body = WebhookRequest,
    responses(
        (status = 204, description = "Event handled or ignored"),
        (status = 400, description = "Missing payload or invalid user id", body = super::ErrorBody),
        (status = 401, description = "Missing or wrong API key", body = super::ErrorBody),
        (status = 404, description = "User not found", body = super::ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "webhooks"
)]
#[instrument(skip(headers, auth_state, stores, payload))]
pub async fn polka_webhook(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Response {
    if let Err(err) = auth_state.guard().authenticate_service(&headers) {
        debug!("Rejected webhook: {err}");
        return Rejection::from(err).into_response();
    }

    let request = match json_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    if request.event != USER_UPGRADED_EVENT {
        debug!("Ignoring webhook event {}", request.event);
        return StatusCode::NO_CONTENT.into_response();
    }

    let Ok(user_id) = Uuid::parse_str(request.data.user_id.trim()) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid user id");
    };

    match stores.users.upgrade_membership(user_id).await {
        Ok(true) => {
            info!("Upgraded user {user_id}");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(err) => {
            error!("Failed to upgrade user: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to upgrade user")
        }
    }
}
