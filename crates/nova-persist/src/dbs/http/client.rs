use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::sse::change_stream;
use crate::error::{PersistError, Result};
use crate::models::{Message, NewMessage, Thread, ThreadPatch};
use crate::trait_client::{ChangeStream, PersistenceClient};

/// Header the API expects from its auth layer
pub const USER_HEADER: &str = "x-user-id";

/// Backend reached through the Nova HTTP API
pub struct HttpPersistenceClient {
    http_client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

#[derive(Deserialize)]
struct ThreadList {
    threads: Vec<Thread>,
}

#[derive(Deserialize)]
struct MessageList {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct Deleted {
    deleted: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: String,
}

impl HttpPersistenceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder().build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    /// Token forwarded to the auth layer in front of the API
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str, user_id: &str) -> RequestBuilder {
        let builder = self
            .http_client
            .request(method, format!("{}{}", self.base_url, path))
            .header(USER_HEADER, user_id);
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, subject: &str) -> Result<Response> {
        let response = builder.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::error_from(response, subject).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, subject: &str) -> Result<T> {
        let response = self.send(builder, subject).await?;
        Ok(response.json().await?)
    }

    async fn error_from(response: Response, subject: &str) -> PersistError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();

        match parsed.as_ref().and_then(|b| b.code.as_deref()) {
            Some("thread_not_found") => PersistError::ThreadNotFound(subject.to_string()),
            Some("message_not_found") => PersistError::MessageNotFound(subject.to_string()),
            Some("invalid_id") => PersistError::InvalidObjectId(subject.to_string()),
            Some("conflict") => PersistError::Conflict(
                parsed.map(|b| b.error).unwrap_or_default(),
            ),
            _ => PersistError::Upstream {
                status: status.as_u16(),
                body,
            },
        }
    }
}

#[async_trait]
impl PersistenceClient for HttpPersistenceClient {
    async fn list_threads(&self, user_id: &str, archived: bool) -> Result<Vec<Thread>> {
        let builder = self
            .request(Method::GET, "/threads", user_id)
            .query(&[("archived", archived)]);
        let list: ThreadList = self.send_json(builder, "threads").await?;
        Ok(list.threads)
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let builder = self.request(Method::GET, &format!("/threads/{}", thread_id), user_id);
        let response = builder.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response, thread_id).await);
        }
        Ok(Some(response.json().await?))
    }

    async fn create_thread(&self, user_id: &str, title: Option<String>) -> Result<Thread> {
        let builder = self
            .request(Method::POST, "/threads", user_id)
            .json(&json!({ "title": title }));
        self.send_json(builder, "threads").await
    }

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> Result<Thread> {
        let builder = self
            .request(Method::PATCH, &format!("/threads/{}", thread_id), user_id)
            .json(&patch);
        self.send_json(builder, thread_id).await
    }

    async fn record_activity(&self, user_id: &str, thread_id: &str) -> Result<Thread> {
        let builder = self.request(
            Method::POST,
            &format!("/threads/{}/activity", thread_id),
            user_id,
        );
        self.send_json(builder, thread_id).await
    }

    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/threads/{}", thread_id), user_id);
        self.send(builder, thread_id).await?;
        Ok(())
    }

    async fn list_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let builder = self.request(
            Method::GET,
            &format!("/threads/{}/messages", thread_id),
            user_id,
        );
        let list: MessageList = self.send_json(builder, thread_id).await?;
        Ok(list.messages)
    }

    async fn insert_message(&self, user_id: &str, message: NewMessage) -> Result<Message> {
        let subject = message.thread_id.clone().unwrap_or_default();
        let builder = self
            .request(Method::POST, "/messages", user_id)
            .json(&message);
        self.send_json(builder, &subject).await
    }

    async fn attach_message(
        &self,
        user_id: &str,
        message_id: &str,
        thread_id: &str,
    ) -> Result<Message> {
        let builder = self
            .request(Method::PATCH, &format!("/messages/{}", message_id), user_id)
            .json(&json!({ "thread_id": thread_id }));
        self.send_json(builder, message_id).await
    }

    async fn delete_messages(&self, user_id: &str, thread_id: &str) -> Result<u64> {
        let builder = self.request(
            Method::DELETE,
            &format!("/threads/{}/messages", thread_id),
            user_id,
        );
        let deleted: Deleted = self.send_json(builder, thread_id).await?;
        Ok(deleted.deleted)
    }

    async fn subscribe_threads(&self, user_id: &str) -> Result<ChangeStream<Thread>> {
        let builder = self.request(Method::GET, "/feed/threads", user_id);
        let response = self.send(builder, "threads").await?;
        Ok(change_stream(response))
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> Result<ChangeStream<Message>> {
        let builder = self.request(
            Method::GET,
            &format!("/feed/threads/{}/messages", thread_id),
            user_id,
        );
        let response = self.send(builder, thread_id).await?;
        Ok(change_stream(response))
    }
}
