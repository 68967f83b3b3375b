//! Operator endpoints: file-server hit counter and the dev-only reset.

use axum::{
    extract::{Extension, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{error, info, instrument, warn};

use super::error_response;
use crate::{auth::AuthState, store::Stores};

/// Per-process site counters.
#[derive(Debug, Default)]
pub struct SiteState {
    hits: AtomicU64,
}

impl SiteState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn reset_hits(&self) {
        self.hits.store(0, Ordering::Relaxed);
    }
}

/// Middleware counting every request that reaches the static file server.
pub async fn count_hit(State(site): State<Arc<SiteState>>, request: Request, next: Next) -> Response {
    site.record_hit();
    next.run(request).await
}

#[instrument(skip(site))]
pub async fn metrics(Extension(site): Extension<Arc<SiteState>>) -> impl IntoResponse {
    Html(format!(
        "<html><body><h1>Welcome, Chirpy Admin</h1><p>Chirpy has been visited {} times!</p></body></html>",
        site.hits()
    ))
}

/// Zero the hit counter and, on the dev platform only, delete every user.
#[instrument(skip(site, auth_state, stores))]
pub async fn reset(
    Extension(site): Extension<Arc<SiteState>>,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(stores): Extension<Stores>,
) -> Response {
    site.reset_hits();

    let platform = auth_state.config().platform();
    if !platform.allows_reset() {
        warn!("Reset refused on platform {platform}");
        return error_response(StatusCode::FORBIDDEN, "Forbidden");
    }

    match stores.users.delete_all().await {
        Ok(removed) => {
            info!("Reset removed {removed} users");
            StatusCode::OK.into_response()
        }
        Err(err) => {
            error!("Failed to delete users: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not delete users")
        }
    }
}
