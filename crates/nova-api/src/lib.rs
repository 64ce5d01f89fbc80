pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::Config;
use crate::routes::{assistant, feed, health, messages, threads};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(openapi::ApiDoc::openapi()) }),
        )
        // Threads
        .route("/threads", get(threads::list_threads).post(threads::create_thread))
        .route(
            "/threads/:thread_id",
            get(threads::get_thread)
                .patch(threads::update_thread)
                .delete(threads::delete_thread),
        )
        .route("/threads/:thread_id/activity", post(threads::record_activity))
        // Messages
        .route(
            "/threads/:thread_id/messages",
            get(messages::list_messages).delete(messages::delete_messages),
        )
        .route("/messages", post(messages::create_message))
        .route("/messages/:message_id", patch(messages::attach_message))
        // Change feeds
        .route("/feed/threads", get(feed::thread_feed))
        .route("/feed/threads/:thread_id/messages", get(feed::message_feed))
        // Assistant
        .route("/threads/:thread_id/reply", post(assistant::reply));

    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    api_routes
        .layer(axum_middleware::from_fn(middleware::logging::log_request))
        .layer(TimeoutLayer::new(timeout))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::permissive();
    }

    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    if config.cors.origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = config
            .cors
            .origins
            .iter()
            .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
