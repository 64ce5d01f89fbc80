use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use nova_persist::{Thread, ThreadPatch};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListThreadsQuery {
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListThreadsResponse {
    pub threads: Vec<Thread>,
}

/// List the caller's threads, most recent first
#[utoipa::path(
    get,
    path = "/threads",
    params(
        ("archived" = Option<bool>, Query, description = "List archived threads instead (default: false)")
    ),
    responses(
        (status = 200, description = "Threads of the caller"),
        (status = 401, description = "Missing x-user-id")
    ),
    tag = "threads"
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<ListThreadsResponse>> {
    let threads = state.persist.list_threads(&user_id, query.archived).await?;
    Ok(Json(ListThreadsResponse { threads }))
}

/// Create a thread; a missing or blank title gets the default one
#[utoipa::path(
    post,
    path = "/threads",
    responses(
        (status = 201, description = "Thread created"),
        (status = 401, description = "Missing x-user-id")
    ),
    tag = "threads"
)]
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    body: Option<Json<CreateThreadRequest>>,
) -> ApiResult<(StatusCode, Json<Thread>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let thread = state.persist.create_thread(&user_id, req.title).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

#[utoipa::path(
    get,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Thread details"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let thread = state
        .persist
        .get_thread(&user_id, &thread_id)
        .await?
        .ok_or(ApiError::ThreadNotFound(thread_id))?;
    Ok(Json(thread))
}

/// Rename, archive/unarchive or reset the counter of a thread
#[utoipa::path(
    patch,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Updated thread"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
    Json(patch): Json<ThreadPatch>,
) -> ApiResult<Json<Thread>> {
    if patch == ThreadPatch::default() {
        return Err(ApiError::BadRequest("empty patch".to_string()));
    }
    let thread = state.persist.update_thread(&user_id, &thread_id, patch).await?;
    Ok(Json(thread))
}

/// Record a new message on the thread: bumps its timestamps and counter
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/activity",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Updated thread"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn record_activity(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let thread = state.persist.record_activity(&user_id, &thread_id).await?;
    Ok(Json(thread))
}

/// Delete the thread row; messages are removed separately beforehand
#[utoipa::path(
    delete,
    path = "/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 204, description = "Thread deleted"),
        (status = 404, description = "Thread not found")
    ),
    tag = "threads"
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.persist.delete_thread(&user_id, &thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
