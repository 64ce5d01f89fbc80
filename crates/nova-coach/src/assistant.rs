use std::sync::Arc;

use nova_llm::{ChatClient, ChatOptions, ChatRequest, Message, Tool, ToolChoice};
use nova_persist::{NewMessage, PersistenceClient, Thread, ThreadPatch};
use nova_types::LLMConfig;
use serde::Deserialize;
use serde_json::json;

use crate::context::ContextWindow;
use crate::error::{AssistantError, Result};
use crate::templates::{DEFAULT_SYSTEM_PROMPT, TITLE_PROMPT};

const NAME_TOOL: &str = "name_conversation";
const MAX_TITLE_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LLMConfig,
    pub system_prompt: String,
    /// Stored messages sent along with each request
    pub history_limit: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: 20,
        }
    }
}

/// Messages written by one assistant turn
#[derive(Debug, Clone)]
pub struct ThreadReply {
    pub user_message: nova_persist::Message,
    pub assistant_message: nova_persist::Message,
    /// Thread as of the end of the turn, renamed when a title was suggested
    pub thread: Thread,
}

#[derive(Deserialize)]
struct TitleArgs {
    title: String,
}

pub struct CoachAssistant {
    client: Arc<dyn ChatClient>,
    config: AssistantConfig,
}

impl CoachAssistant {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self::with_config(client, AssistantConfig::default())
    }

    pub fn with_config(client: Arc<dyn ChatClient>, config: AssistantConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    /// System prompt followed by the last `history_limit` messages
    pub fn build_prompt(&self, history: &[nova_persist::Message]) -> Vec<Message> {
        ContextWindow::from_history(
            self.config.system_prompt.clone(),
            history,
            self.config.history_limit,
        )
        .into_messages()
    }

    pub async fn reply(&self, history: &[nova_persist::Message]) -> Result<String> {
        let request = ChatRequest::new(self.config.llm.model.clone(), self.build_prompt(history))
            .with_options(self.base_options());

        let response = self.client.chat(request).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Coach reply generated"
            );
        }

        response
            .content
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AssistantError::EmptyReply)
    }

    /// Ask the model to name a conversation through a forced function call
    pub async fn suggest_title(&self, first_message: &str) -> Result<String> {
        let tool = Tool::function(
            NAME_TOOL,
            "Give the conversation a short descriptive title",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "At most six words" }
                },
                "required": ["title"]
            }),
        );
        let options = self
            .base_options()
            .tools(vec![tool])
            .tool_choice(ToolChoice::force(NAME_TOOL));
        let request = ChatRequest::new(
            self.config.llm.model.clone(),
            vec![Message::system(TITLE_PROMPT), Message::user(first_message)],
        )
        .with_options(options);

        let response = self.client.chat(request).await?;
        let args: TitleArgs = response.tool_arguments(NAME_TOOL)?;

        let title: String = args
            .title
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .trim_end_matches(|c| c == '.' || c == '!')
            .chars()
            .take(MAX_TITLE_CHARS)
            .collect();
        if title.trim().is_empty() {
            return Err(AssistantError::EmptyReply);
        }
        Ok(title.trim().to_string())
    }

    /// Run one full assistant turn inside a stored thread
    ///
    /// The user message is saved first, then the reply is generated from the
    /// stored history and saved too. A thread still carrying the default
    /// title is renamed from the user's message; failing to name it only
    /// logs a warning.
    pub async fn reply_in_thread(
        &self,
        persist: &dyn PersistenceClient,
        user_id: &str,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadReply> {
        let thread = persist
            .get_thread(user_id, thread_id)
            .await?
            .ok_or_else(|| AssistantError::ThreadNotFound(thread_id.to_string()))?;

        let user_message = persist
            .insert_message(user_id, NewMessage::user(content).in_thread(thread_id))
            .await?;
        persist.record_activity(user_id, thread_id).await?;

        let history = persist.list_messages(user_id, thread_id).await?;
        let text = self.reply(&history).await?;

        let assistant_message = persist
            .insert_message(user_id, NewMessage::assistant(text).in_thread(thread_id))
            .await?;
        let mut thread_after = persist.record_activity(user_id, thread_id).await?;

        if thread.has_default_title() {
            match self.suggest_title(content).await {
                Ok(title) => {
                    match persist
                        .update_thread(user_id, thread_id, ThreadPatch::title(title))
                        .await
                    {
                        Ok(renamed) => thread_after = renamed,
                        Err(e) => tracing::warn!(thread_id, error = %e, "Failed to rename thread"),
                    }
                }
                Err(e) => tracing::warn!(thread_id, error = %e, "Failed to suggest a thread title"),
            }
        }

        tracing::info!(thread_id, user_id, "Assistant turn completed");
        Ok(ThreadReply {
            user_message,
            assistant_message,
            thread: thread_after,
        })
    }

    fn base_options(&self) -> ChatOptions {
        let mut options = ChatOptions::new();
        if let Some(temperature) = self.config.llm.temperature {
            options = options.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.llm.max_tokens {
            options = options.max_tokens(max_tokens);
        }
        options
    }
}
