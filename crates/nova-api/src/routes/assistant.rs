use axum::{
    extract::{Path, State},
    Json,
};
use nova_persist::{Message, Thread};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub user_message: Message,
    pub assistant_message: Message,
    pub thread: Thread,
}

/// Post a user message and get the coach's reply
///
/// Both messages are stored in the thread; a default-titled thread is
/// named after the user's message.
#[utoipa::path(
    post,
    path = "/threads/{thread_id}/reply",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Stored user and assistant messages"),
        (status = 402, description = "Gateway quota exhausted"),
        (status = 404, description = "Thread not found"),
        (status = 429, description = "Gateway rate limit exceeded"),
        (status = 503, description = "Assistant not configured")
    ),
    tag = "assistant"
)]
pub async fn reply(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> ApiResult<Json<ReplyResponse>> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("message content is empty".to_string()));
    }

    let assistant = state.assistant()?;
    let turn = assistant
        .reply_in_thread(state.persist.as_ref(), &user_id, &thread_id, content)
        .await?;

    Ok(Json(ReplyResponse {
        user_message: turn.user_message,
        assistant_message: turn.assistant_message,
        thread: turn.thread,
    }))
}
