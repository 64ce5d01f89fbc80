use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::routes::{assistant, feed, health, messages, threads};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        threads::list_threads,
        threads::create_thread,
        threads::get_thread,
        threads::update_thread,
        threads::record_activity,
        threads::delete_thread,
        messages::list_messages,
        messages::delete_messages,
        messages::create_message,
        messages::attach_message,
        feed::thread_feed,
        feed::message_feed,
        assistant::reply,
    ),
    components(schemas(health::HealthResponse, ErrorBody)),
    tags(
        (name = "health", description = "Service status"),
        (name = "threads", description = "Conversation threads"),
        (name = "messages", description = "Messages within threads"),
        (name = "feed", description = "Server-Sent Events change feeds"),
        (name = "assistant", description = "Coaching assistant"),
    )
)]
pub struct ApiDoc;
