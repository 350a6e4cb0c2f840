use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::api::{app, AppState};
use crate::auth::{generate_jwt, AdminRoleCheck, Claims, RoleClaim};
use crate::config::AppConfig;
use crate::database::memory::MemoryRepository;
use crate::database::models::Journal;

pub const TEST_SECRET: &str = "router-test-secret";

/// Router over an empty in-memory store
pub fn test_app(check: AdminRoleCheck) -> Router {
    let mut config = AppConfig::development();
    config.security.jwt_secret = TEST_SECRET.to_string();
    config.security.admin_role_check = check;
    config.api.enable_request_logging = false;

    let state = AppState::with_jwt(Arc::new(MemoryRepository::<Journal>::new()), config);
    app(state)
}

/// Bearer token carrying the given role entries, in order
pub fn token(roles: &[&str]) -> String {
    let claims = Claims::new("u-1", "tester", roles.iter().map(|r| RoleClaim::new(*r)).collect(), 1);
    generate_jwt(&claims, TEST_SECRET).expect("sign test token")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Send one request through the router; an empty response body reads as `Null`
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>, bearer: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse { status, body }
}

/// Percent-encode a JSON value for use as a query parameter
pub fn query_json(value: &Value) -> String {
    url::form_urlencoded::byte_serialize(value.to_string().as_bytes()).collect()
}
