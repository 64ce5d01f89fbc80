use chrono::{DateTime, Utc};
use nova_types::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Single turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub user_id: String,
    /// None until the message is attached to a thread
    pub thread_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn from_new(user_id: impl Into<String>, new: NewMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            thread_id: new.thread_id,
            role: new.role,
            content: new.content,
            created_at: Utc::now(),
        }
    }

    pub fn belongs_to(&self, thread_id: &str) -> bool {
        self.thread_id.as_deref() == Some(thread_id)
    }
}

impl Record for Message {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub thread_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            thread_id: None,
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            thread_id: None,
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}
