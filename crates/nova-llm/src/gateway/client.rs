use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_GATEWAY_URL;
use crate::error::{GatewayError, Result};
use crate::traits::{ChatClient, ChatRequest, ChatResponse, TokenUsage};
use crate::types::{Message, Tool, ToolCall, ToolChoice};

/// Chat completions over HTTP, no SDK
pub struct GatewayClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| GatewayError::Config("invalid API key format".to_string()))?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http_client,
            base_url: DEFAULT_GATEWAY_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatClient for GatewayClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = CompletionPayload {
            model: &request.model,
            messages: &request.messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            tools: request.options.tools.as_deref(),
            tool_choice: request.options.tool_choice.as_ref(),
        };

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion"
        );

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Gateway rejected chat completion");
            return Err(GatewayError::from_status(status, body));
        }

        let raw: serde_json::Value = response.json().await?;
        let parsed: CompletionResponse = serde_json::from_value(raw.clone())?;

        let choice = parsed.choices.into_iter().next();
        let (content, tool_calls, finish_reason) = match choice {
            Some(choice) => (
                choice.message.content,
                choice.message.tool_calls.unwrap_or_default(),
                choice.finish_reason,
            ),
            None => (None, Vec::new(), None),
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            usage: parsed.usage.map(|usage| TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
            finish_reason,
            raw,
        })
    }
}

#[derive(Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a ToolChoice>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ChatOptions;

    #[test]
    fn test_payload_shape() {
        let request = ChatRequest::new("test-model", vec![Message::system("be kind"), Message::user("hi")])
            .with_options(
                ChatOptions::new()
                    .tools(vec![Tool::function("noop", "does nothing", serde_json::json!({"type": "object"}))])
                    .tool_choice(ToolChoice::force("noop")),
            );
        let payload = CompletionPayload {
            model: &request.model,
            messages: &request.messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            tools: request.options.tools.as_deref(),
            tool_choice: request.options.tool_choice.as_ref(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["tools"][0]["function"]["name"], "noop");
        assert_eq!(json["tool_choice"]["function"]["name"], "noop");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = GatewayClient::new("key").unwrap().with_base_url("http://localhost:9000/v1/");
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
    }
}
