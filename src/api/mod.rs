use crate::{
    auth::{AuthConfig, AuthState, PasswordHasher},
    store::{PgStore, Stores},
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, services::ServeDir, set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
mod openapi;

pub use handlers::SiteState;
pub use openapi::openapi;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Assemble the full application: documented API routes, admin routes, the
/// counted static file server and the request tracing layers.
pub fn app(
    auth_state: Arc<AuthState>,
    stores: Stores,
    site: Arc<SiteState>,
    static_dir: &Path,
) -> Router {
    let files = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            site.clone(),
            handlers::admin::count_hit,
        ))
        .service(ServeDir::new(static_dir));

    let (router, _openapi) = router().split_for_parts();
    router
        .route("/admin/metrics", get(handlers::admin::metrics))
        .route("/admin/reset", post(handlers::admin::reset))
        .nest_service("/app", files)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID_HEADER),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID_HEADER,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state))
                .layer(Extension(stores))
                .layer(Extension(site)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to connect to the database or bind the port
pub async fn new(port: u16, dsn: String, auth_config: AuthConfig, static_dir: &Path) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let stores = Stores::from_backend(PgStore::new(pool));

    info!(
        "Starting on platform {} (scheme mode {:?})",
        auth_config.platform(),
        auth_config.scheme_mode()
    );
    let auth_state = Arc::new(AuthState::new(
        auth_config,
        stores.refresh_tokens.clone(),
        PasswordHasher::default(),
    ));

    let app = app(auth_state, stores, Arc::new(SiteState::new()), static_dir);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
