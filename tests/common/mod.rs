//! Common test utilities for all integration tests.
//!
//! Every [`TestApp`] owns a private in-memory SQLite database with the
//! migrations applied, so tests never observe each other's data.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use school_api::{
    api::{build_router, ApiState},
    config::{AppConfig, DatabaseConfig},
    storage::{create_pool, DbPool},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const PASSWORD: &str = "Passw0rd!";

pub struct TestApp {
    pub state: ApiState,
    pub pool: DbPool,
}

impl TestApp {
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

pub async fn setup_test_app() -> TestApp {
    let config = AppConfig { database: DatabaseConfig::in_memory(), ..Default::default() };
    let pool = create_pool(&config.database).await.expect("create sqlite pool");
    let state = ApiState::new(pool.clone(), config).expect("build api state");

    TestApp { state, pool }
}

pub async fn send_request(
    app: &TestApp,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = if let Some(json) = body {
        let bytes = serde_json::to_vec(&json).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("build request")
    } else {
        builder.body(Body::empty()).expect("build request")
    };

    app.router().oneshot(request).await.expect("request")
}

/// Send a body verbatim, e.g. `null` or malformed JSON
pub async fn send_raw(app: &TestApp, method: Method, path: &str, body: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");

    app.router().oneshot(request).await.expect("request")
}

pub async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes =
        to_bytes(response.into_body(), usize::MAX).await.expect("read response body as bytes");
    serde_json::from_slice(&bytes).expect("parse json response")
}

pub async fn register(app: &TestApp, user_name: &str, password: &str, roles: &[&str]) -> Response {
    send_request(
        app,
        Method::POST,
        "/authentication/register",
        None,
        Some(json!({
            "FirstName": "Jane",
            "LastName": "Doe",
            "UserName": user_name,
            "Password": password,
            "Email": format!("{}@school.test", user_name),
            "Roles": roles,
        })),
    )
    .await
}

pub async fn login(app: &TestApp, user_name: &str, password: &str) -> Response {
    send_request(
        app,
        Method::POST,
        "/authentication/login",
        None,
        Some(json!({ "UserName": user_name, "Password": password })),
    )
    .await
}

/// Register a student with `roles` and return a bearer token for them
pub async fn token_for(app: &TestApp, user_name: &str, roles: &[&str]) -> String {
    let response = register(app, user_name, PASSWORD, roles).await;
    assert_eq!(response.status(), StatusCode::CREATED, "register {}", user_name);

    let response = login(app, user_name, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK, "login {}", user_name);

    let body: Value = read_json(response).await;
    body["Token"].as_str().expect("token in login response").to_string()
}

/// Create an organization through the API and return its JSON representation
pub async fn create_organization(app: &TestApp, body: Value) -> Value {
    let response = send_request(app, Method::POST, "/organizations", None, Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}
