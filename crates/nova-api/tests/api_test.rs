use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use nova_api::{build_router, config::Config, error::ApiError, state::AppState};
use nova_coach::CoachAssistant;
use nova_llm::{ChatClient, ChatRequest, ChatResponse, GatewayError};
use nova_persist::{InMemoryBackend, PersistenceClient};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(persist: Arc<InMemoryBackend>, assistant: Option<CoachAssistant>) -> Router {
    build_router(Arc::new(AppState::new(Config::default(), persist, assistant)))
}

fn app() -> (Arc<InMemoryBackend>, Router) {
    let persist = Arc::new(InMemoryBackend::new());
    (persist.clone(), app_with(persist, None))
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (_, app) = app();

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["assistant"], "disabled");
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let (_, app) = app();

    let (status, body) = send(&app, request("GET", "/threads", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_thread_lifecycle() {
    let (_, app) = app();

    let (status, created) = send(
        &app,
        request("POST", "/threads", Some("alice"), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "New Conversation");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, renamed) = send(
        &app,
        request(
            "PATCH",
            &format!("/threads/{}", id),
            Some("alice"),
            Some(json!({ "title": "Sleep" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Sleep");

    send(
        &app,
        request(
            "PATCH",
            &format!("/threads/{}", id),
            Some("alice"),
            Some(json!({ "archived": true })),
        ),
    )
    .await;

    let (_, active) = send(&app, request("GET", "/threads", Some("alice"), None)).await;
    assert_eq!(active["threads"].as_array().unwrap().len(), 0);
    let (_, archived) = send(
        &app,
        request("GET", "/threads?archived=true", Some("alice"), None),
    )
    .await;
    assert_eq!(archived["threads"][0]["id"], id.as_str());

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/threads/{}", id), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        request("GET", &format!("/threads/{}", id), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "thread_not_found");
}

#[tokio::test]
async fn test_threads_are_scoped_to_caller() {
    let (persist, app) = app();
    let thread = persist.create_thread("alice", None).await.unwrap();

    let (status, _) = send(
        &app,
        request("GET", &format!("/threads/{}", thread.id), Some("bob"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(&app, request("GET", "/threads", Some("bob"), None)).await;
    assert!(listed["threads"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_messages_and_activity() {
    let (persist, app) = app();
    let thread = persist.create_thread("alice", None).await.unwrap();

    for content in ["first", "second"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/messages",
                Some("alice"),
                Some(json!({ "thread_id": thread.id, "role": "user", "content": content })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        send(
            &app,
            request(
                "POST",
                &format!("/threads/{}/activity", thread.id),
                Some("alice"),
                None,
            ),
        )
        .await;
    }

    let (_, listed) = send(
        &app,
        request("GET", &format!("/threads/{}/messages", thread.id), Some("alice"), None),
    )
    .await;
    assert_eq!(listed["messages"][0]["content"], "first");
    assert_eq!(listed["messages"][1]["content"], "second");

    let (_, stored) = send(
        &app,
        request("GET", &format!("/threads/{}", thread.id), Some("alice"), None),
    )
    .await;
    assert_eq!(stored["message_count"], 2);

    let (status, deleted) = send(
        &app,
        request("DELETE", &format!("/threads/{}/messages", thread.id), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["deleted"], 2);
}

#[tokio::test]
async fn test_attach_conflict() {
    let (persist, app) = app();
    let a = persist.create_thread("alice", None).await.unwrap();
    let b = persist.create_thread("alice", None).await.unwrap();

    let (_, message) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some("alice"),
            Some(json!({ "role": "user", "content": "before any thread" })),
        ),
    )
    .await;
    let message_id = message["id"].as_str().unwrap().to_string();

    let (status, attached) = send(
        &app,
        request(
            "PATCH",
            &format!("/messages/{}", message_id),
            Some("alice"),
            Some(json!({ "thread_id": a.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attached["thread_id"], a.id.as_str());

    let (status, body) = send(
        &app,
        request(
            "PATCH",
            &format!("/messages/{}", message_id),
            Some("alice"),
            Some(json!({ "thread_id": b.id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_reply_without_assistant_is_unavailable() {
    let (persist, app) = app();
    let thread = persist.create_thread("alice", None).await.unwrap();

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/threads/{}/reply", thread.id),
            Some("alice"),
            Some(json!({ "content": "Hi" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "assistant_unavailable");
}

struct FailingClient(fn() -> GatewayError);

#[async_trait]
impl ChatClient for FailingClient {
    async fn chat(&self, _request: ChatRequest) -> nova_llm::Result<ChatResponse> {
        Err((self.0)())
    }
}

#[tokio::test]
async fn test_reply_maps_gateway_limits() {
    let cases: [(fn() -> GatewayError, StatusCode, &str); 2] = [
        (|| GatewayError::RateLimited, StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        (|| GatewayError::QuotaExhausted, StatusCode::PAYMENT_REQUIRED, "quota_exhausted"),
    ];

    for (make_error, expected_status, expected_code) in cases {
        let persist = Arc::new(InMemoryBackend::new());
        let thread = persist.create_thread("alice", None).await.unwrap();
        let assistant = CoachAssistant::new(Arc::new(FailingClient(make_error)));
        let app = app_with(persist, Some(assistant));

        let (status, body) = send(
            &app,
            request(
                "POST",
                &format!("/threads/{}/reply", thread.id),
                Some("alice"),
                Some(json!({ "content": "Hi" })),
            ),
        )
        .await;

        assert_eq!(status, expected_status);
        assert_eq!(body["code"], expected_code);
    }
}

#[tokio::test]
async fn test_message_feed_requires_owned_thread() {
    let (persist, app) = app();
    let thread = persist.create_thread("alice", None).await.unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/feed/threads/{}/messages", thread.id),
            Some("bob"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request("GET", "/feed/threads", Some("alice"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/event-stream"
    );
}

#[test]
fn test_api_error_status() {
    use axum::response::IntoResponse;

    let response = ApiError::BadRequest("Test error".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
