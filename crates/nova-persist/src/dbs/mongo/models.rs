use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::error::{PersistError, Result};
use crate::models::{Message, MessageRole, Thread};

/// MongoDB-specific Thread document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<bson::DateTime>,
    pub message_count: i64,
    pub archived: bool,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

/// MongoDB-specific Message document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: String,
    pub thread_id: Option<ObjectId>,
    pub role: MessageRole,
    pub content: String,
    pub created_at: bson::DateTime,
}

pub fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|e| PersistError::InvalidObjectId(format!("{}: {}", id, e)))
}

impl MongoThread {
    pub fn new(user_id: String, title: Option<String>) -> Self {
        let now = bson::DateTime::now();
        Self {
            id: ObjectId::new(),
            user_id,
            title: Thread::normalize_title(title),
            last_message_at: None,
            message_count: 0,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id.to_hex(),
            user_id: thread.user_id,
            title: thread.title,
            last_message_at: thread.last_message_at.map(|d| d.to_chrono()),
            message_count: thread.message_count.max(0) as u64,
            archived: thread.archived,
            created_at: thread.created_at.to_chrono(),
            updated_at: thread.updated_at.to_chrono(),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id.to_hex(),
            user_id: msg.user_id,
            thread_id: msg.thread_id.map(|id| id.to_hex()),
            role: msg.role,
            content: msg.content,
            created_at: msg.created_at.to_chrono(),
        }
    }
}
