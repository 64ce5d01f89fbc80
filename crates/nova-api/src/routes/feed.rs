use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use nova_persist::ChangeStream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::{auth::CurrentUser, error::ApiResult, state::AppState};

/// Event name carried by every change frame
pub const CHANGE_EVENT: &str = "change";

/// Push the caller's thread changes as Server-Sent Events
#[utoipa::path(
    get,
    path = "/feed/threads",
    responses((status = 200, description = "Change feed", content_type = "text/event-stream")),
    tag = "feed"
)]
pub async fn thread_feed(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let changes = state.persist.subscribe_threads(&user_id).await?;
    tracing::debug!(user_id = %user_id, "Thread feed opened");
    Ok(sse(changes))
}

/// Push message inserts and deletes of one thread
#[utoipa::path(
    get,
    path = "/feed/threads/{thread_id}/messages",
    params(("thread_id" = String, Path, description = "Thread ID")),
    responses(
        (status = 200, description = "Change feed", content_type = "text/event-stream"),
        (status = 404, description = "Thread not found")
    ),
    tag = "feed"
)]
pub async fn message_feed(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(thread_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if state.persist.get_thread(&user_id, &thread_id).await?.is_none() {
        return Err(crate::error::ApiError::ThreadNotFound(thread_id));
    }
    let changes = state.persist.subscribe_messages(&user_id, &thread_id).await?;
    tracing::debug!(user_id = %user_id, thread_id = %thread_id, "Message feed opened");
    Ok(sse(changes))
}

fn sse<T>(changes: ChangeStream<T>) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Send + 'static,
{
    let events = changes.filter_map(|change| async move {
        match Event::default().event(CHANGE_EVENT).json_data(&change) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode change event");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
