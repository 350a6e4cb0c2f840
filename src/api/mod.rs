pub mod routes;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{CurrentUserProvider, JwtUserProvider};
use crate::config::{AppConfig, SecurityConfig};
use crate::database::models::Journal;
use crate::database::repository::Repository;
use crate::handlers::{journal, status};
use crate::middleware::route_guard;
use crate::services::JournalService;
use routes::{JOURNAL_COLLECTION, JOURNAL_COUNT, JOURNAL_ITEM};

/// Shared, read-only state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub journals: Arc<JournalService>,
    pub users: Arc<dyn CurrentUserProvider>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn Repository<Journal>>,
        users: Arc<dyn CurrentUserProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            journals: Arc::new(JournalService::new(repository, &config.security)),
            users,
            config: Arc::new(config),
        }
    }

    /// State with bearer-JWT authentication using the configured secret
    pub fn with_jwt(repository: Arc<dyn Repository<Journal>>, config: AppConfig) -> Self {
        let users = Arc::new(JwtUserProvider::new(config.security.jwt_secret.clone()));
        Self::new(repository, users, config)
    }
}

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let journal_routes = Router::new()
        .route(
            JOURNAL_COLLECTION,
            get(journal::find).post(journal::create).patch(journal::update_all),
        )
        .route(JOURNAL_COUNT, get(journal::count))
        .route(
            JOURNAL_ITEM,
            get(journal::find_by_id)
                .patch(journal::update_by_id)
                .put(journal::replace_by_id)
                .delete(journal::delete_by_id),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), route_guard));

    let mut router = Router::new()
        // Public
        .route("/", get(status::root))
        .route("/health", get(status::health))
        .merge(journal_routes)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .with_state(state);

    if let Some(cors) = cors_layer(&config.security) {
        router = router.layer(cors);
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }
    if security.cors_origins.is_empty() || security.cors_origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    use super::routes::{AccessPolicy, ROUTES};
    use crate::auth::AdminRoleCheck;
    use crate::testing::{query_json, send, test_app, token};

    fn concrete(path: &str, id: &str) -> String {
        path.replace(":id", id)
    }

    #[tokio::test]
    async fn public_routes_never_require_a_token() {
        let app = test_app(AdminRoleCheck::LegacyIndex);
        let id = Uuid::new_v4().to_string();
        for route in ROUTES.iter().filter(|r| r.policy == AccessPolicy::Public) {
            let body = route.body.map(|_| json!({ "title": "public" }));
            let res = send(&app, route.method.clone(), &concrete(route.path, &id), body, None).await;
            assert_ne!(res.status, StatusCode::UNAUTHORIZED, "{} {}", route.method, route.path);
        }
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_or_bad_tokens() {
        let app = test_app(AdminRoleCheck::LegacyIndex);
        let id = Uuid::new_v4().to_string();
        for route in ROUTES.iter().filter(|r| r.policy == AccessPolicy::Authenticated) {
            let uri = concrete(route.path, &id);
            let res = send(&app, route.method.clone(), &uri, Some(json!({ "title": "t" })), None).await;
            assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{} {}", route.method, route.path);
            assert_eq!(res.body["error"]["name"], "AuthenticationError");

            let res = send(&app, route.method.clone(), &uri, Some(json!({ "title": "t" })), Some("garbage")).await;
            assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn create_then_edit_as_user() {
        let app = test_app(AdminRoleCheck::LegacyIndex);

        let res = send(&app, Method::POST, "/journal", Some(json!({ "title": "x", "status": 2 })), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["title"], "x");
        assert_eq!(res.body["status"], 0);
        assert!(res.body.get("content").is_none());
        let id = res.body["id"].as_str().unwrap().to_string();

        let uri = format!("/journal/{}", id);
        let res = send(&app, Method::PATCH, &uri, Some(json!({ "title": "y" })), Some(&token(&["user"]))).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.body.is_null());

        let res = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(res.body, json!({ "id": id, "title": "y", "status": 1 }));

        let res = send(&app, Method::PATCH, &uri, Some(json!({ "title": "z" })), Some(&token(&["user", "admin"]))).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        let res = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(res.body["status"], 2);
    }

    #[tokio::test]
    async fn put_keeps_body_status_and_delete_needs_no_token() {
        let app = test_app(AdminRoleCheck::AnyPosition);
        let res = send(&app, Method::POST, "/journal", Some(json!({ "title": "x" })), None).await;
        let uri = format!("/journal/{}", res.body["id"].as_str().unwrap());

        let res = send(&app, Method::PUT, &uri, Some(json!({ "title": "p", "status": 2 })), Some(&token(&["user"]))).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        let res = send(&app, Method::GET, &uri, None, None).await;
        assert_eq!(res.body["status"], 2);

        let res = send(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        let res = send(&app, Method::DELETE, &uri, None, None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["error"]["name"], "NotFoundError");
    }

    #[tokio::test]
    async fn bodies_are_validated_before_handlers() {
        let app = test_app(AdminRoleCheck::LegacyIndex);

        let res = send(&app, Method::POST, "/journal", Some(json!({ "content": "no title" })), None).await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(res.body["error"]["name"], "ValidationError");
        assert_eq!(res.body["error"]["details"][0]["path"], "/title");

        let res = send(&app, Method::POST, "/journal", Some(json!({ "id": Uuid::new_v4(), "title": "x" })), None).await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

        let res = send(&app, Method::PATCH, "/journal", Some(json!({ "status": 9 })), None).await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

        // authentication is checked before the body
        let uri = format!("/journal/{}", Uuid::new_v4());
        let res = send(&app, Method::PUT, &uri, Some(json!({})), None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        let res = send(&app, Method::PUT, &uri, Some(json!({})), Some(&token(&[]))).await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        use axum::body::Body;
        use axum::http::{header, Request};
        use tower::ServiceExt;

        let app = test_app(AdminRoleCheck::LegacyIndex);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/journal")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bodies_without_json_content_type_get_the_error_envelope() {
        use axum::body::Body;
        use axum::http::{header, Request};
        use tower::ServiceExt;

        let app = test_app(AdminRoleCheck::LegacyIndex);
        for content_type in [None, Some("text/plain")] {
            let mut builder = Request::builder().method(Method::POST).uri("/journal");
            if let Some(value) = content_type {
                builder = builder.header(header::CONTENT_TYPE, value);
            }
            let request = builder.body(Body::from(r#"{"title":"x"}"#)).unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["error"]["statusCode"], 415);
            assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");
        }

        let res = send(&app, Method::GET, "/journal/count", None, None).await;
        assert_eq!(res.body, json!({ "count": 0 }));
    }

    #[tokio::test]
    async fn head_follows_the_get_policy() {
        let app = test_app(AdminRoleCheck::LegacyIndex);
        let res = send(&app, Method::POST, "/journal", Some(json!({ "title": "x" })), None).await;
        let item = format!("/journal/{}", res.body["id"].as_str().unwrap());

        for uri in ["/journal", "/journal/count", item.as_str()] {
            let res = send(&app, Method::HEAD, uri, None, None).await;
            assert_eq!(res.status, StatusCode::OK, "HEAD {}", uri);
        }
    }

    #[tokio::test]
    async fn unknown_and_non_uuid_ids_are_404() {
        let app = test_app(AdminRoleCheck::LegacyIndex);
        let auth = token(&["user"]);
        for uri in [format!("/journal/{}", Uuid::new_v4()), "/journal/not-a-uuid".to_string()] {
            assert_eq!(send(&app, Method::GET, &uri, None, None).await.status, StatusCode::NOT_FOUND);
            assert_eq!(send(&app, Method::DELETE, &uri, None, None).await.status, StatusCode::NOT_FOUND);
            let res = send(&app, Method::PATCH, &uri, Some(json!({ "title": "t" })), Some(&auth)).await;
            assert_eq!(res.status, StatusCode::NOT_FOUND);
            let res = send(&app, Method::PUT, &uri, Some(json!({ "title": "t" })), Some(&auth)).await;
            assert_eq!(res.status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn count_filter_and_bulk_update() {
        let app = test_app(AdminRoleCheck::LegacyIndex);
        for title in ["beta", "alpha", "gamma"] {
            send(&app, Method::POST, "/journal", Some(json!({ "title": title })), None).await;
        }

        let res = send(&app, Method::GET, "/journal/count", None, None).await;
        assert_eq!(res.body, json!({ "count": 3 }));

        let filter = query_json(&json!({ "order": "title DESC", "limit": 2, "fields": ["title"] }));
        let res = send(&app, Method::GET, &format!("/journal?filter={}", filter), None, None).await;
        assert_eq!(res.body, json!([{ "title": "gamma" }, { "title": "beta" }]));

        let where_clause = query_json(&json!({ "title": { "inq": ["alpha", "beta"] } }));
        let res = send(
            &app,
            Method::PATCH,
            &format!("/journal?where={}", where_clause),
            Some(json!({ "content": "tagged" })),
            None,
        )
        .await;
        assert_eq!(res.body, json!({ "count": 2 }));

        let tagged = query_json(&json!({ "content": "tagged" }));
        let res = send(&app, Method::GET, &format!("/journal/count?where={}", tagged), None, None).await;
        assert_eq!(res.body, json!({ "count": 2 }));

        let bad = query_json(&json!({ "where": { "owner": "x" } }));
        let res = send(&app, Method::GET, &format!("/journal?filter={}", bad), None, None).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn service_endpoints() {
        let app = test_app(AdminRoleCheck::LegacyIndex);
        let res = send(&app, Method::GET, "/", None, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["name"], "Journal API");

        let res = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["status"], "ok");
    }
}
