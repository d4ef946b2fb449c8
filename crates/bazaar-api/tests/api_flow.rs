//! End-to-end flows through the real router on an in-memory database.

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use bazaar_api::{AppState, AppStateInner, AuthConfig, auth, router};
use bazaar_db::Database;

fn setup() -> (Router, AppState) {
    let db = Database::open_in_memory().unwrap();
    let state = AppStateInner::new(db, &AuthConfig::new("integration-secret"));
    auth::ensure_admin(&state.db, "carol", "carol@example.com", "carolpw").unwrap();
    (router(state.clone()), state)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": password,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
    body
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/token",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login {username}: {body}");
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn classifieds_scenario() {
    let (app, _) = setup();

    let alice = register(&app, "alice", "pw123").await;
    assert_eq!(alice["role"], "user");
    register(&app, "bob", "bobpw").await;

    let alice_token = login(&app, "alice", "pw123").await;
    let (status, me) = send(&app, Method::GET, "/users/me", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["email"], "alice@example.com");
    assert_eq!(me["role"], "user");

    let (status, ad) = send(
        &app,
        Method::POST,
        "/ads",
        Some(&alice_token),
        Some(json!({ "title": "Bike", "kind": "sell", "description": "A red bike" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{ad}");
    assert_eq!(ad["id"], 1);
    assert_eq!(ad["title"], "Bike");
    assert_eq!(ad["owner"]["username"], "alice");

    let bob_token = login(&app, "bob", "bobpw").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/comments/1",
        Some(&bob_token),
        Some(json!({ "text": "Still available?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::DELETE, "/ads/1", Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    let (status, _) = send(&app, Method::GET, "/ads/1", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let carol_token = login(&app, "carol", "carolpw").await;
    let (status, _) = send(&app, Method::DELETE, "/ads/1", Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/ads/1", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, comments) = send(&app, Method::GET, "/comments", None, None).await;
    assert_eq!(comments, json!([]));
}

#[tokio::test]
async fn duplicate_registration_keeps_one_row() {
    let (app, state) = setup();
    register(&app, "alice", "pw123").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "alice", "email": "other@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].as_str().unwrap().contains("already exists"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "alice2", "email": "alice@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert!(state.db.get_user_by_email("other@example.com").unwrap().is_none());
    assert!(state.db.get_user_by_username("alice2").unwrap().is_none());
    assert_eq!(state.db.get_user_by_username("alice").unwrap().unwrap().email, "alice@example.com");
}

#[tokio::test]
async fn self_registration_as_admin_is_refused() {
    let (app, state) = setup();
    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": "mallory",
            "email": "mallory@example.com",
            "password": "pw",
            "role": "admin",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(state.db.get_user_by_username("mallory").unwrap().is_none());
}

#[tokio::test]
async fn comment_on_missing_ad_persists_nothing() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;
    let token = login(&app, "alice", "pw123").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/comments/42",
        Some(&token),
        Some(json!({ "text": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Ad not found");

    let (_, comments) = send(&app, Method::GET, "/comments", None, None).await;
    assert_eq!(comments, json!([]));
}

#[tokio::test]
async fn bad_tokens_are_rejected() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;
    let token = login(&app, "alice", "pw123").await;

    let (status, _) = send(&app, Method::GET, "/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/users/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = AppStateInner::new(Database::open_in_memory().unwrap(), &AuthConfig::new("other"))
        .tokens
        .issue("alice", "alice@example.com")
        .unwrap();
    let (status, body) = send(&app, Method::GET, "/users/me", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Invalid or expired token");

    let (status, _) = send(&app, Method::GET, &format!("/users/me?token={token}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_does_not_reveal_usernames() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;

    let (wrong_status, wrong_body) = send(
        &app,
        Method::POST,
        "/token",
        None,
        Some(json!({ "username": "alice", "password": "wrong" })),
    )
    .await;
    let (unknown_status, unknown_body) = send(
        &app,
        Method::POST,
        "/token",
        None,
        Some(json!({ "username": "nobody", "password": "wrong" })),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn promotion_requires_admin_and_is_one_way() {
    let (app, _) = setup();
    let bob = register(&app, "bob", "bobpw").await;
    let alice = register(&app, "alice", "pw123").await;
    let bob_id = bob["id"].as_i64().unwrap();
    let alice_id = alice["id"].as_i64().unwrap();

    let alice_token = login(&app, "alice", "pw123").await;
    let bob_token = login(&app, "bob", "bobpw").await;
    let (status, _) = send(&app, Method::PATCH, &format!("/users/{bob_id}"), Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let carol_token = login(&app, "carol", "carolpw").await;
    let (status, body) = send(&app, Method::PATCH, &format!("/users/{bob_id}"), Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    // A token issued before the promotion now resolves to an admin.
    let (_, me) = send(&app, Method::GET, "/users/me", Some(&bob_token), None).await;
    assert_eq!(me["role"], "admin");

    let (status, _) = send(&app, Method::PATCH, &format!("/users/{bob_id}"), Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::PATCH, "/users/999", Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::PATCH, &format!("/users/{alice_id}"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn profile_lists_own_ads_and_comments() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;
    let token = login(&app, "alice", "pw123").await;

    let (status, ad) = send(
        &app,
        Method::POST,
        "/ads",
        Some(&token),
        Some(json!({ "title": "Desk", "description": "A wooden desk, barely used" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ad["kind"], "sell");

    let ad_id = ad["id"].as_i64().unwrap();
    send(
        &app,
        Method::POST,
        &format!("/comments/{ad_id}"),
        Some(&token),
        Some(json!({ "text": "Price is negotiable" })),
    )
    .await;

    let (_, me) = send(&app, Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(me["ads"].as_array().unwrap().len(), 1);
    assert_eq!(me["comments"].as_array().unwrap().len(), 1);
    assert_eq!(me["comments"][0]["ad_id"], ad_id);

    let (status, listed) = send(&app, Method::GET, &format!("/ads/{ad_id}/comments"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["text"], "Price is negotiable");
}

#[tokio::test]
async fn comment_deletion_is_author_or_admin() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;
    register(&app, "bob", "bobpw").await;
    let alice_token = login(&app, "alice", "pw123").await;
    let bob_token = login(&app, "bob", "bobpw").await;
    let carol_token = login(&app, "carol", "carolpw").await;

    send(
        &app,
        Method::POST,
        "/ads",
        Some(&alice_token),
        Some(json!({ "title": "Sofa", "kind": "buy", "description": "Looking for a sofa" })),
    )
    .await;
    let (_, first) = send(&app, Method::POST, "/comments/1", Some(&bob_token), Some(json!({ "text": "I have one" }))).await;
    let (_, second) = send(&app, Method::POST, "/comments/1", Some(&bob_token), Some(json!({ "text": "Two, actually" }))).await;

    let first_id = first["id"].as_i64().unwrap();
    let second_id = second["id"].as_i64().unwrap();

    let (status, _) = send(&app, Method::DELETE, &format!("/comments/{first_id}"), Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &format!("/comments/{first_id}"), Some(&bob_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &format!("/comments/{second_id}"), Some(&carol_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/comments/{second_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;
    let token = login(&app, "alice", "pw123").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/ads",
        Some(&token),
        Some(json!({ "title": "Bike", "description": "bike" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/ads",
        Some(&token),
        Some(json!({ "title": "   ", "description": "A red bike" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "zed", "email": "not-an-email", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

async fn send_raw(app: &Router, method: Method, uri: &str, token: Option<&str>, body: &str) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn assert_detail(status: StatusCode, body: &Value) {
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body["detail"].is_string(), "expected a JSON detail, got {body}");
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let (app, _) = setup();
    register(&app, "alice", "pw123").await;
    let token = login(&app, "alice", "pw123").await;

    let (status, body) = send_raw(&app, Method::POST, "/register", None, r#"{"username":"al"#).await;
    assert_detail(status, &body);

    let (status, body) = send(
        &app,
        Method::POST,
        "/register",
        None,
        Some(json!({ "username": "zed", "email": "zed@example.com" })),
    )
    .await;
    assert_detail(status, &body);

    let (status, body) = send(
        &app,
        Method::POST,
        "/token",
        None,
        Some(json!({ "username": "alice", "password": "pw123", "extra": true })),
    )
    .await;
    assert_detail(status, &body);

    let (status, body) = send_raw(&app, Method::POST, "/ads", Some(&token), "not json").await;
    assert_detail(status, &body);

    let (status, body) = send(&app, Method::GET, "/ads/abc", None, None).await;
    assert_detail(status, &body);

    let (status, body) = send(&app, Method::DELETE, "/comments/abc", Some(&token), None).await;
    assert_detail(status, &body);

    // Nothing was created by the rejected bodies.
    let (_, ads) = send(&app, Method::GET, "/ads", None, None).await;
    assert_eq!(ads.as_array().unwrap().len(), 0);
}
