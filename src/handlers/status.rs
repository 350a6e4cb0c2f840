use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::api::AppState;

/// GET / - Service name, version and endpoint list
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Journal API",
        "version": version,
        "description": "Journal REST resource with role-aware review status",
        "endpoints": {
            "create": "POST /journal (public)",
            "count": "GET /journal/count?where= (public)",
            "find": "GET /journal?filter= (public)",
            "update_all": "PATCH /journal?where= (public)",
            "find_by_id": "GET /journal/:id?filter= (public)",
            "update_by_id": "PATCH /journal/:id (bearer token)",
            "replace_by_id": "PUT /journal/:id (bearer token)",
            "delete_by_id": "DELETE /journal/:id (public)",
            "health": "GET /health (public)",
        }
    }))
}

/// GET /health - Store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.journals.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                })),
            )
        }
    }
}
