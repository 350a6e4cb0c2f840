use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::AppState;
use crate::auth::UserProfile;
use crate::database::models::{Count, Journal, JournalInput, JournalPatch, NewJournal};
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    /// JSON-encoded filter: where, fields, order, limit, offset/skip
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WhereQuery {
    /// JSON-encoded where clause
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
}

/// POST /journal - Create a journal
pub async fn create(State(state): State<AppState>, Json(input): Json<NewJournal>) -> ApiResult<Journal> {
    let journal = state.journals.create(input).await?;
    Ok(ApiResponse::success(journal))
}

/// GET /journal/count - Count journals matching `where`
pub async fn count(State(state): State<AppState>, Query(query): Query<WhereQuery>) -> ApiResult<Count> {
    let count = state.journals.count(query.where_clause.as_deref()).await?;
    Ok(ApiResponse::success(count))
}

/// GET /journal - List journals matching `filter`
pub async fn find(State(state): State<AppState>, Query(query): Query<FilterQuery>) -> ApiResult<Vec<Value>> {
    let journals = state.journals.find(query.filter.as_deref()).await?;
    Ok(ApiResponse::success(journals))
}

/// PATCH /journal - Apply a partial update to every journal matching `where`
pub async fn update_all(
    State(state): State<AppState>,
    Query(query): Query<WhereQuery>,
    Json(patch): Json<JournalPatch>,
) -> ApiResult<Count> {
    let count = state.journals.update_all(patch, query.where_clause.as_deref()).await?;
    Ok(ApiResponse::success(count))
}

/// GET /journal/:id
pub async fn find_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Value> {
    let journal = state.journals.find_by_id(&id, query.filter.as_deref()).await?;
    Ok(ApiResponse::success(journal))
}

/// PATCH /journal/:id - Edit as the current user (sets the review status)
pub async fn update_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<UserProfile>,
    Json(patch): Json<JournalPatch>,
) -> ApiResult<()> {
    state.journals.update_by_id(&id, patch, &user).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /journal/:id
pub async fn replace_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(user): Extension<UserProfile>,
    Json(input): Json<JournalInput>,
) -> ApiResult<()> {
    state.journals.replace_by_id(&id, input, &user).await?;
    Ok(ApiResponse::no_content())
}

/// DELETE /journal/:id
pub async fn delete_by_id(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.journals.delete_by_id(&id).await?;
    Ok(ApiResponse::no_content())
}
