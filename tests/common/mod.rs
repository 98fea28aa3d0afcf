// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use vidtube::config::Config;
use vidtube::db::{DocumentStore, MemoryStore};
use vidtube::routes::create_router;
use vidtube::AppState;

/// Check if a MongoDB server is available via environment variable.
#[allow(dead_code)]
pub fn mongo_available() -> bool {
    std::env::var("MONGODB_URI")
        .map(|uri| uri.starts_with("mongodb"))
        .unwrap_or(false)
}

/// Skip test with message if MongoDB is not available.
#[macro_export]
macro_rules! require_mongo {
    () => {
        if !crate::common::mongo_available() {
            eprintln!("⚠️  Skipping: MONGODB_URI not set");
            return;
        }
    };
}

/// Build state over a fresh in-memory store.
#[allow(dead_code)]
pub async fn test_state() -> Arc<AppState> {
    test_state_with_store(Arc::new(MemoryStore::new())).await
}

#[allow(dead_code)]
pub async fn test_state_with_store(store: Arc<dyn DocumentStore>) -> Arc<AppState> {
    let state = AppState::new(Config::default(), store).expect("Failed to build state");
    state.db.init_indexes().await.expect("Failed to create indexes");
    Arc::new(state)
}

/// Create a test app over an in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state().await;
    (create_router(state.clone()), state)
}

/// Build a request, optionally with a bearer token and a JSON body.
#[allow(dead_code)]
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request and return status and JSON body.
#[allow(dead_code)]
pub async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

/// Values of every `Set-Cookie` header.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

/// Registration body for a user with predictable credentials.
#[allow(dead_code)]
pub fn registration(username: &str) -> Value {
    json!({
        "fullname": format!("{} Tester", username),
        "email": format!("{}@example.com", username),
        "username": username,
        "password": "password123",
        "avatar": format!("https://cdn.example.com/{}.png", username),
    })
}

/// A registered, logged-in user.
#[allow(dead_code)]
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[allow(dead_code)]
pub async fn register_and_login(app: &axum::Router, username: &str) -> TestUser {
    let (status, body) = send(
        app,
        request(Method::POST, "/api/v1/users/register", None, Some(registration(username))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/v1/users/login",
            None,
            Some(json!({"username": username, "password": "password123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    TestUser {
        id: body["data"]["user"]["_id"].as_str().unwrap().to_string(),
        username: username.to_string(),
        access_token: body["data"]["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["data"]["refreshToken"].as_str().unwrap().to_string(),
    }
}

/// Publish a video as `user` and return its id.
#[allow(dead_code)]
pub async fn publish_video(app: &axum::Router, user: &TestUser, title: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/v1/videos",
            Some(&user.access_token),
            Some(json!({
                "title": title,
                "description": format!("About {}", title),
                "videoFile": "https://cdn.example.com/v.mp4",
                "thumbnail": "https://cdn.example.com/t.png",
                "duration": 62.5,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "publish failed: {body}");
    body["data"]["_id"].as_str().unwrap().to_string()
}
