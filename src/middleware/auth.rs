use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, Method,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::warn;

use crate::api::routes::{self, AccessPolicy};
use crate::api::AppState;
use crate::error::ApiError;

/// Route guard: authenticates callers of protected routes and checks JSON
/// bodies against the route's schema view before the handler runs.
///
/// On success the resolved `UserProfile` is available to handlers as an
/// `Extension`. Routes missing from the table are treated as protected.
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    match guard(&state, request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

async fn guard(state: &AppState, request: Request) -> Result<Request, ApiError> {
    let matched = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    // HEAD is served by the GET handler
    let method = if *request.method() == Method::HEAD {
        Method::GET
    } else {
        request.method().clone()
    };
    let route = routes::lookup(&method, &matched);
    if route.is_none() {
        warn!("No access policy for {} {}; requiring authentication", request.method(), matched);
    }
    let policy = route.map_or(AccessPolicy::Authenticated, |r| r.policy);

    let (mut parts, body) = request.into_parts();

    if policy == AccessPolicy::Authenticated {
        let user = state.users.current_user(&parts.headers).await.map_err(|e| {
            warn!("Rejected {} {}: {}", parts.method, matched, e);
            ApiError::from(e)
        })?;
        parts.extensions.insert(user);
    }

    let Some(view) = route.and_then(|r| r.body) else {
        return Ok(Request::from_parts(parts, body));
    };

    if !is_json_content(&parts.headers) {
        return Err(ApiError::unsupported_media_type(
            "Expected request with Content-Type: application/json",
        ));
    }

    let limit = state.config.api.max_request_size_bytes;
    let bytes: Bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::payload_too_large(format!("Request body exceeds {} bytes", limit)))?;

    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::invalid_json(format!("Request body is not valid JSON: {}", e)))?;
    view.validate(&value)?;

    parts.headers.insert(CONTENT_LENGTH, bytes.len().into());
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

/// `application/json` or an `application/*+json` subtype, parameters ignored
fn is_json_content(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
