use nova_llm::Message;
use nova_persist::MessageRole;

/// Prompt handed to the model: system prompt plus the recent history
#[derive(Debug, Clone)]
pub struct ContextWindow {
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

impl ContextWindow {
    /// Keep the last `limit` stored messages, oldest first
    pub fn from_history(
        system_prompt: impl Into<String>,
        history: &[nova_persist::Message],
        limit: usize,
    ) -> Self {
        let start = history.len().saturating_sub(limit);
        let messages = history[start..]
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(to_llm_message)
            .collect();

        Self {
            system_prompt: system_prompt.into(),
            messages,
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(self.system_prompt));
        messages.extend(self.messages);
        messages
    }
}

fn to_llm_message(message: &nova_persist::Message) -> Message {
    match message.role {
        MessageRole::User => Message::user(message.content.clone()),
        MessageRole::Assistant => Message::assistant(message.content.clone()),
    }
}
