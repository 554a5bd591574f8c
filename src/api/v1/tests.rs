//! Router-level tests: the full `/api/v1` surface over an in-memory user store.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::{
    app::build_router,
    config::Config,
    middleware::http::BODY_LIMIT_BYTES,
    repos::memory_user_repo::MemoryUserStore,
    services::auth::{SessionService, TokenCodec},
    state::AppState,
};

const SECRET: &[u8] = b"router-test-secret";

fn config() -> Config {
    Config::from_lookup(|key| {
        match key {
            "DATABASE_URL" => Some("postgres://localhost/auth"),
            "JWT_SECRET" => Some("router-test-secret"),
            "SERVER_IP" => Some("127.0.0.1"),
            "APP_ENV" => Some("dev"),
            _ => None,
        }
        .map(str::to_string)
    })
    .unwrap()
}

fn app_with(rotate: bool) -> (Router, Arc<MemoryUserStore>) {
    let store = Arc::new(MemoryUserStore::new());
    let sessions = SessionService::new(
        store.clone(),
        TokenCodec::new(SECRET),
        "127.0.0.1".to_string(),
        vec![2, 1, 3, 4],
        rotate,
    );
    let state = AppState::new(Arc::new(sessions), false);
    (build_router(state, &config()), store)
}

fn app() -> (Router, Arc<MemoryUserStore>) {
    app_with(false)
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn raw_json_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn cookie_request(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("jwt={cookie}"))
        .body(Body::empty())
        .unwrap()
}

fn bearer_request(token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_json(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(headers: &HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .unwrap()
        .to_string()
}

fn refresh_from_set_cookie(headers: &HeaderMap) -> String {
    let raw = set_cookie(headers);
    let first = raw.split(';').next().unwrap();
    first.strip_prefix("jwt=").unwrap().to_string()
}

async fn register(app: &Router, name: &str, password: &str) -> Response {
    send(
        app,
        json_request(
            Method::POST,
            "/api/v1/users",
            json!({"user_name": name, "password": password}),
        ),
    )
    .await
}

async fn login(app: &Router, name: &str, password: &str) -> Response {
    send(
        app,
        json_request(
            Method::POST,
            "/api/v1/login",
            json!({"user_name": name, "password": password}),
        ),
    )
    .await
}

/// Registers alice and logs in; returns (access, refresh).
async fn alice_session(app: &Router) -> (String, String) {
    assert_eq!(register(app, "alice", "pw1").await.status(), StatusCode::CREATED);
    let res = login(app, "alice", "pw1").await;
    assert_eq!(res.status(), StatusCode::OK);
    let refresh = refresh_from_set_cookie(res.headers());
    let body = body_json(res).await;
    (body["access_token"].as_str().unwrap().to_string(), refresh)
}

#[tokio::test]
async fn register_returns_identity_and_rejects_duplicates() {
    let (app, _) = app();

    let res = register(&app, "alice", "pw1").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(body_json(res).await, json!(1));

    let res = register(&app, "alice", "pw1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn login_sets_refresh_cookie_bound_to_user() {
    let (app, store) = app();
    register(&app, "alice", "pw1").await;

    let res = login(&app, "alice", "pw1").await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookie = set_cookie(res.headers());
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(cookie.contains("SameSite=None"));
    assert!(!cookie.contains("Secure"));

    let refresh = refresh_from_set_cookie(res.headers());
    let body = body_json(res).await;
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body.get("refresh_token").is_none());

    assert_eq!(store.get(1).unwrap().refresh_token, refresh);
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_user() {
    let (app, _) = app();
    register(&app, "alice", "pw1").await;

    let res = login(&app, "alice", "wrong").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().get(header::SET_COOKIE).is_none());

    let res = login(&app, "bob", "pw1").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cookie_refresh_then_logout_then_refresh_fails() {
    let (app, store) = app();
    let (access, refresh) = alice_session(&app).await;

    let res = send(&app, cookie_request("/api/v1/refresh", &refresh)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    let access2 = body["access_token"].as_str().unwrap();
    assert_ne!(access2, access);
    assert_eq!(store.get(1).unwrap().refresh_token, refresh);

    let res = send(&app, cookie_request("/api/v1/logout", &refresh)).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let cleared = set_cookie(res.headers());
    assert!(cleared.starts_with("jwt=;"));
    assert!(cleared.contains("Max-Age=-1"));
    assert_eq!(store.get(1).unwrap().refresh_token, "");

    let res = send(&app, cookie_request("/api/v1/refresh", &refresh)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn body_refresh_and_logout() {
    let (app, store) = app();
    let (_, refresh) = alice_session(&app).await;

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/refresh",
            json!({"refresh_token": refresh}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_json(res).await["access_token"].is_string());

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/logout",
            json!({"refresh_token": refresh}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.get(1).unwrap().refresh_token, "");

    // Already revoked.
    let res = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/logout",
            json!({"refresh_token": refresh}),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refresh_without_credential_is_unauthorized() {
    let (app, _) = app();

    let res = send(
        &app,
        Request::builder()
            .uri("/api/v1/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(res).await["error"], "refresh token not found");

    let res = send(&app, raw_json_request("/api/v1/refresh", "{}")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cookie_logout_without_cookie_is_no_content() {
    let (app, _) = app();

    let res = send(
        &app,
        Request::builder()
            .uri("/api/v1/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn cookie_logout_of_dead_token_clears_cookie_and_forbids() {
    let (app, _) = app();

    let res = send(&app, cookie_request("/api/v1/logout", "not-a-live-token")).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(set_cookie(res.headers()).contains("Max-Age=-1"));
}

#[tokio::test]
async fn rotation_replaces_refresh_cookie() {
    let (app, store) = app_with(true);
    let (_, refresh) = alice_session(&app).await;

    let res = send(&app, cookie_request("/api/v1/refresh", &refresh)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let rotated = refresh_from_set_cookie(res.headers());
    assert_ne!(rotated, refresh);
    assert_eq!(store.get(1).unwrap().refresh_token, rotated);

    let res = send(&app, cookie_request("/api/v1/refresh", &refresh)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_route_admits_required_roles() {
    let (app, _) = app();
    let (access, _) = alice_session(&app).await;

    let res = send(&app, bearer_request(&access)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"name": "Go auth", "version": "1.0"})
    );
}

#[tokio::test]
async fn protected_route_forbids_missing_role() {
    let (app, store) = app();
    alice_session(&app).await;
    store.set_roles(1, &[2, 1, 4]);

    let res = login(&app, "alice", "pw1").await;
    let access = body_json(res).await["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    let res = send(&app, bearer_request(&access)).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(res).await["status"], 403);
}

#[tokio::test]
async fn refresh_token_is_rejected_as_bearer() {
    let (app, _) = app();
    let (_, refresh) = alice_session(&app).await;

    let res = send(&app, bearer_request(&refresh)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_name_is_stored_as_given() {
    let (app, store) = app();

    assert_eq!(register(&app, "alice ", "pw1").await.status(), StatusCode::CREATED);
    assert_eq!(store.get(1).unwrap().user_name, "alice ");

    assert_eq!(login(&app, "alice ", "pw1").await.status(), StatusCode::OK);
    assert_eq!(login(&app, "alice", "pw1").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_route_requires_well_formed_bearer() {
    let (app, _) = app();

    let res = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1")
            .header(header::AUTHORIZATION, "Bearer")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(&app, bearer_request("garbage")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn json_bodies_are_strict() {
    let (app, _) = app();

    let res = send(
        &app,
        raw_json_request(
            "/api/v1/users",
            r#"{"user_name":"alice","password":"pw1","admin":true}"#,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(
        &app,
        raw_json_request(
            "/api/v1/users",
            r#"{"user_name":"alice","password":"pw1"}{"x":1}"#,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = send(&app, raw_json_request("/api/v1/login", "not json")).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _) = app();
    let big = vec![b' '; BODY_LIMIT_BYTES + 1];

    let res = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, big.len())
            .body(Body::from(big))
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(res).await["status"], 413);
}

#[tokio::test]
async fn health_and_fallback() {
    let (app, _) = app();

    let res = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

    let res = send(
        &app,
        Request::builder()
            .uri("/api/v1/nope")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(res).await["status"], 404);
}
