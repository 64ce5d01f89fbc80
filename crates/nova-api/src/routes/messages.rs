use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use nova_persist::{Message, NewMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteMessagesResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub struct AttachMessageRequest {
    pub thread_id: String,
}

/// Messages of a thread, oldest first
#[utoipa::path(
    get,
    path = "/threads/{thread_id}/messages",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses((status = 200, description = "Messages of the thread")),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<ListMessagesResponse>> {
    let messages = state.persist.list_messages(&user_id, &thread_id).await?;
    Ok(Json(ListMessagesResponse { messages }))
}

#[utoipa::path(
    delete,
    path = "/threads/{thread_id}/messages",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Number of deleted messages"),
        (status = 404, description = "Thread not found")
    ),
    tag = "messages"
)]
pub async fn delete_messages(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<DeleteMessagesResponse>> {
    let deleted = state.persist.delete_messages(&user_id, &thread_id).await?;
    Ok(Json(DeleteMessagesResponse { deleted }))
}

/// Store a message, optionally before any thread exists
#[utoipa::path(
    post,
    path = "/messages",
    responses(
        (status = 201, description = "Message stored"),
        (status = 404, description = "Thread not found")
    ),
    tag = "messages"
)]
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Json(new): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    if new.content.trim().is_empty() {
        return Err(ApiError::BadRequest("message content is empty".to_string()));
    }
    let message = state.persist.insert_message(&user_id, new).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Attach a thread-less message to a thread
#[utoipa::path(
    patch,
    path = "/messages/{message_id}",
    params(("message_id" = String, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Attached message"),
        (status = 404, description = "Message or thread not found"),
        (status = 409, description = "Message already belongs to another thread")
    ),
    tag = "messages"
)]
pub async fn attach_message(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(message_id): Path<String>,
    Json(req): Json<AttachMessageRequest>,
) -> ApiResult<Json<Message>> {
    let message = state
        .persist
        .attach_message(&user_id, &message_id, &req.thread_id)
        .await?;
    Ok(Json(message))
}
