#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Method, Request, StatusCode},
    Router,
};
use chirpy::{
    api::{self, SiteState},
    auth::{AuthConfig, AuthState, PasswordHasher, Platform, SchemeMode},
    store::{MemoryStore, Stores},
};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::{path::Path, sync::Arc};
use tower::ServiceExt;

const API_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

fn app_with(platform: Platform, mode: SchemeMode) -> Router {
    let stores = Stores::from_backend(MemoryStore::new());
    let config = AuthConfig::new(
        SecretString::from("integration-secret".to_string()),
        SecretString::from(API_KEY.to_string()),
    )
    .with_platform(platform)
    .with_scheme_mode(mode);
    let auth_state = Arc::new(AuthState::new(
        config,
        stores.refresh_tokens.clone(),
        PasswordHasher::with_params(1024, 1, 1).expect("valid argon2 params"),
    ));
    api::app(auth_state, stores, Arc::new(SiteState::new()), Path::new("."))
}

fn app() -> Router {
    app_with(Platform::Prod, SchemeMode::Strict)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Send a raw body, with an optional content type, and return only the status.
async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    authorization: Option<&str>,
    content_type: Option<&str>,
    body: &'static str,
) -> StatusCode {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    if let Some(value) = content_type {
        builder = builder.header("content-type", value);
    }
    let request = builder.body(Body::from(body)).unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

async fn register_and_login(app: &Router, email: &str, password: &str) -> Value {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, login) = send(
        app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    login
}

fn bearer(token: &Value) -> String {
    format!("Bearer {}", token.as_str().unwrap())
}

#[tokio::test]
async fn login_issues_session_and_refresh_tokens() {
    let app = app();
    let login = register_and_login(&app, "walt@example.com", "04234").await;

    assert_eq!(login["email"], "walt@example.com");
    assert_eq!(login["is_chirpy_red"], false);
    assert!(!login["token"].as_str().unwrap().is_empty());
    let refresh_token = login["refresh_token"].as_str().unwrap();
    assert_eq!(refresh_token.len(), 64);
    assert!(refresh_token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn wrong_password_gets_generic_unauthorized() {
    let app = app();
    register_and_login(&app, "jesse@example.com", "right").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "jesse@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "right" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect email or password");
}

#[tokio::test]
async fn posting_requires_a_session() {
    let app = app();
    let login = register_and_login(&app, "saul@example.com", "pw").await;

    let (status, chirp) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&login["token"])),
        Some(json!({ "body": "What a Kerfuffle today" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(chirp["body"], "What a **** today");
    assert_eq!(chirp["user_id"], login["id"]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chirps",
        None,
        Some(json!({ "body": "anonymous" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some("Bearer not-a-jwt"),
        Some(json!({ "body": "forged" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&login["token"])),
        Some(json!({ "body": "x".repeat(141) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Chirp is too long");
}

#[tokio::test]
async fn only_the_author_can_delete_a_chirp() {
    let app = app();
    let alice = register_and_login(&app, "alice@example.com", "a").await;
    let bob = register_and_login(&app, "bob@example.com", "b").await;

    let (_, chirp) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&bearer(&alice["token"])),
        Some(json!({ "body": "alice was here" })),
    )
    .await;
    let uri = format!("/api/chirps/{}", chirp["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(&bearer(&bob["token"])), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bearer(&alice["token"])), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bearer(&alice["token"])), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn refresh_then_revoke() {
    let app = app();
    let login = register_and_login(&app, "skyler@example.com", "pw").await;
    let refresh = bearer(&login["refresh_token"]);

    let (status, body) = send(&app, Method::POST, "/api/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::OK);
    let new_token = bearer(&body["token"]);

    // The minted session token is accepted for writes.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chirps",
        Some(&new_token),
        Some(json!({ "body": "fresh session" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Refresh tokens are not single use.
    let (status, _) = send(&app, Method::POST, "/api/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, "/api/revoke", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::POST, "/api/refresh", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A session token is not a refresh token.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/refresh",
        Some(&bearer(&login["token"])),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/api/revoke", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_user_requires_session_and_changes_login() {
    let app = app();
    let login = register_and_login(&app, "hank@example.com", "old").await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users",
        None,
        Some(json!({ "email": "hank@dea.gov", "password": "new" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, user) = send(
        &app,
        Method::PUT,
        "/api/users",
        Some(&bearer(&login["token"])),
        Some(json!({ "email": "hank@dea.gov", "password": "new" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "hank@dea.gov");
    assert_eq!(user["id"], login["id"]);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "hank@dea.gov", "password": "new" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn duplicate_and_invalid_registrations_are_rejected() {
    let app = app();
    register_and_login(&app, "gus@example.com", "pw").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "GUS@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users",
        None,
        Some(json!({ "email": "not-an-email", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_upgrades_membership_with_api_key() {
    let app = app();
    let login = register_and_login(&app, "mike@example.com", "pw").await;
    let upgrade = json!({ "event": "user.upgraded", "data": { "user_id": login["id"] } });
    let api_key = format!("ApiKey {API_KEY}");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some("ApiKey wrong"),
        Some(upgrade.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        None,
        Some(upgrade.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(json!({ "event": "user.downgraded", "data": { "user_id": login["id"] } })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(json!({ "event": "user.upgraded", "data": { "user_id": uuid::Uuid::new_v4() } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/polka/webhooks",
        Some(&api_key),
        Some(upgrade),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, relogin) = send(
        &app,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "mike@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(relogin["is_chirpy_red"], true);
}

#[tokio::test]
async fn chirps_list_filters_and_sorts() {
    let app = app();
    let alice = register_and_login(&app, "a@example.com", "a").await;
    let bob = register_and_login(&app, "b@example.com", "b").await;

    for (login, body) in [(&alice, "first"), (&bob, "second"), (&alice, "third")] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/chirps",
            Some(&bearer(&login["token"])),
            Some(json!({ "body": body })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, all) = send(&app, Method::GET, "/api/chirps", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|chirp| chirp["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["first", "second", "third"]);

    let uri = format!(
        "/api/chirps?author_id={}&sort=desc",
        alice["id"].as_str().unwrap()
    );
    let (status, mine) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|chirp| chirp["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["third", "first"]);

    let (status, _) = send(&app, Method::GET, "/api/chirps?author_id=nope", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_deletes_users_on_dev_only() {
    let dev = app_with(Platform::Dev, SchemeMode::Strict);
    register_and_login(&dev, "todd@example.com", "pw").await;

    let (status, _) = send(&dev, Method::POST, "/admin/reset", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &dev,
        Method::POST,
        "/api/login",
        None,
        Some(json!({ "email": "todd@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app(), Method::POST, "/admin/reset", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn legacy_scheme_mode_accepts_bare_tokens() {
    let legacy = app_with(Platform::Prod, SchemeMode::Legacy);
    let login = register_and_login(&legacy, "lydia@example.com", "pw").await;
    let bare = login["token"].as_str().unwrap();

    let (status, _) = send(
        &legacy,
        Method::POST,
        "/api/chirps",
        Some(bare),
        Some(json!({ "body": "no prefix" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let strict = app();
    let login = register_and_login(&strict, "lydia@example.com", "pw").await;
    let (status, _) = send(
        &strict,
        Method::POST,
        "/api/chirps",
        Some(login["token"].as_str().unwrap()),
        Some(json!({ "body": "no prefix" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &strict,
        Method::POST,
        "/api/chirps",
        Some(&format!("bearer {}", login["token"].as_str().unwrap())),
        Some(json!({ "body": "lowercase scheme" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn credentials_are_checked_before_the_body() {
    let app = app();
    let json = Some("application/json");

    let cases: [(Method, &str, Option<&str>, &'static str); 8] = [
        (Method::POST, "/api/polka/webhooks", None, ""),
        (Method::POST, "/api/polka/webhooks", json, "{}"),
        (Method::POST, "/api/polka/webhooks", json, "{not json"),
        (Method::PUT, "/api/users", json, "{}"),
        (Method::PUT, "/api/users", None, ""),
        (Method::POST, "/api/chirps", None, ""),
        (Method::POST, "/api/chirps", json, "{\"body\":"),
        (Method::DELETE, "/api/chirps/not-a-uuid", None, ""),
    ];
    for (method, uri, content_type, body) in cases {
        let status = send_raw(&app, method.clone(), uri, None, content_type, body).await;
        assert_eq!(
            status,
            StatusCode::UNAUTHORIZED,
            "{method} {uri} with body {body:?}"
        );
    }
}

#[tokio::test]
async fn authenticated_requests_with_bad_bodies_are_bad_requests() {
    let app = app();
    let login = register_and_login(&app, "marie@example.com", "pw").await;
    let session = bearer(&login["token"]);
    let api_key = format!("ApiKey {API_KEY}");
    let json = Some("application/json");

    let cases: [(Method, &str, &str, Option<&str>, &'static str); 6] = [
        (Method::POST, "/api/polka/webhooks", api_key.as_str(), None, ""),
        (Method::POST, "/api/polka/webhooks", api_key.as_str(), json, "{}"),
        (Method::PUT, "/api/users", session.as_str(), json, "{}"),
        (Method::POST, "/api/chirps", session.as_str(), None, ""),
        (Method::POST, "/api/chirps", session.as_str(), json, "{\"body\":"),
        (Method::DELETE, "/api/chirps/not-a-uuid", session.as_str(), None, ""),
    ];
    for (method, uri, authorization, content_type, body) in cases {
        let status =
            send_raw(&app, method.clone(), uri, Some(authorization), content_type, body).await;
        assert_eq!(
            status,
            StatusCode::BAD_REQUEST,
            "{method} {uri} with body {body:?}"
        );
    }

    let status = send_raw(&app, Method::POST, "/api/login", None, None, "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() {
    let app = app();
    register_and_login(&app, "huell@example.com", "pw").await;

    let mut bodies = Vec::new();
    for email in ["huell@example.com", "kuby@example.com"] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": "not-it" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
}
