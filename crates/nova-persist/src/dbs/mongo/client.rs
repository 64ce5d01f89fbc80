use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{self, oid::ObjectId};
use mongodb::change_stream::event::{ChangeStreamEvent, OperationType};
use mongodb::Client;
use nova_types::ChangeEvent;

use crate::dbs::mongo::models::{parse_id, MongoMessage};
use crate::dbs::mongo::repositories::{self, MongoMessageRepository, MongoThreadRepository};
use crate::error::{PersistError, Result};
use crate::models::{Message, NewMessage, Thread, ThreadPatch};
use crate::trait_client::{ChangeStream, PersistenceClient};

pub struct MongoPersistenceClient {
    thread_repo: MongoThreadRepository,
    message_repo: MongoMessageRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let db = client.database(database);
        for collection in [repositories::THREADS, repositories::MESSAGES] {
            repositories::enable_pre_images(&db, collection).await?;
        }

        Ok(Self {
            thread_repo: MongoThreadRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
        })
    }

    async fn require_thread(&self, user_id: &str, thread_id: &str) -> Result<ObjectId> {
        let object_id = parse_id(thread_id)?;
        self.thread_repo
            .get_thread(object_id, user_id)
            .await?
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        Ok(object_id)
    }
}

/// Deletes only carry the document key
fn deleted_id<T>(event: &ChangeStreamEvent<T>) -> Option<String> {
    event
        .document_key
        .as_ref()
        .and_then(|key| key.get_object_id("_id").ok())
        .map(|id| id.to_hex())
}

fn thread_change<M: Into<Thread>>(event: ChangeStreamEvent<M>) -> Option<ChangeEvent<Thread>> {
    match event.operation_type {
        OperationType::Insert => event
            .full_document
            .map(|doc| ChangeEvent::Insert { record: doc.into() }),
        OperationType::Update | OperationType::Replace => event
            .full_document
            .map(|doc| ChangeEvent::Update { record: doc.into() }),
        OperationType::Delete => deleted_id(&event).map(|id| ChangeEvent::Delete { id }),
        _ => None,
    }
}

/// An update on a message is an attach: it shows up as new in its thread
fn message_change(event: ChangeStreamEvent<MongoMessage>) -> Option<ChangeEvent<Message>> {
    match event.operation_type {
        OperationType::Insert | OperationType::Update | OperationType::Replace => event
            .full_document
            .map(|doc| ChangeEvent::Insert { record: doc.into() }),
        OperationType::Delete => deleted_id(&event).map(|id| ChangeEvent::Delete { id }),
        _ => None,
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn list_threads(&self, user_id: &str, archived: bool) -> Result<Vec<Thread>> {
        let threads = self.thread_repo.list_threads(user_id, archived).await?;
        Ok(threads.into_iter().map(Into::into).collect())
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let object_id = parse_id(thread_id)?;
        let thread = self.thread_repo.get_thread(object_id, user_id).await?;
        Ok(thread.map(Into::into))
    }

    async fn create_thread(&self, user_id: &str, title: Option<String>) -> Result<Thread> {
        let thread = self
            .thread_repo
            .create_thread(user_id.to_string(), title)
            .await?;
        Ok(thread.into())
    }

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> Result<Thread> {
        let object_id = parse_id(thread_id)?;
        self.thread_repo
            .update_thread(object_id, user_id, &patch)
            .await?
            .map(Into::into)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    async fn record_activity(&self, user_id: &str, thread_id: &str) -> Result<Thread> {
        let object_id = parse_id(thread_id)?;
        self.thread_repo
            .record_activity(object_id, user_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }

    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let object_id = parse_id(thread_id)?;
        if !self.thread_repo.delete_thread(object_id, user_id).await? {
            return Err(PersistError::ThreadNotFound(thread_id.to_string()));
        }
        Ok(())
    }

    async fn list_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let object_id = parse_id(thread_id)?;
        let messages = self.message_repo.get_messages(object_id, user_id).await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    async fn insert_message(&self, user_id: &str, message: NewMessage) -> Result<Message> {
        let thread_id = match &message.thread_id {
            Some(thread_id) => Some(self.require_thread(user_id, thread_id).await?),
            None => None,
        };

        let document = MongoMessage {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            thread_id,
            role: message.role,
            content: message.content,
            created_at: bson::DateTime::now(),
        };
        self.message_repo.save_message(&document).await?;
        Ok(document.into())
    }

    async fn attach_message(
        &self,
        user_id: &str,
        message_id: &str,
        thread_id: &str,
    ) -> Result<Message> {
        let thread_oid = self.require_thread(user_id, thread_id).await?;
        let message_oid = parse_id(message_id)?;

        if let Some(attached) = self.message_repo.attach(message_oid, user_id, thread_oid).await? {
            return Ok(attached.into());
        }

        // Nothing matched: either missing, or already attached somewhere
        let existing = self
            .message_repo
            .get_message(message_oid, user_id)
            .await?
            .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))?;
        match existing.thread_id {
            Some(current) if current == thread_oid => Ok(existing.into()),
            Some(current) => Err(PersistError::Conflict(format!(
                "message {} already belongs to thread {}",
                message_id,
                current.to_hex()
            ))),
            None => Err(PersistError::Internal(format!(
                "message {} could not be attached",
                message_id
            ))),
        }
    }

    async fn delete_messages(&self, user_id: &str, thread_id: &str) -> Result<u64> {
        let object_id = self.require_thread(user_id, thread_id).await?;
        self.message_repo.delete_messages(object_id, user_id).await
    }

    async fn subscribe_threads(&self, user_id: &str) -> Result<ChangeStream<Thread>> {
        let stream = self.thread_repo.watch(user_id).await?;
        let changes = stream.filter_map(|item| async move {
            match item {
                Ok(event) => thread_change(event),
                Err(e) => {
                    tracing::warn!("Thread change stream error: {}", e);
                    None
                }
            }
        });
        Ok(Box::pin(changes))
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> Result<ChangeStream<Message>> {
        let object_id = self.require_thread(user_id, thread_id).await?;
        let stream = self.message_repo.watch(object_id).await?;
        let changes = stream.filter_map(|item| async move {
            match item {
                Ok(event) => message_change(event),
                Err(e) => {
                    tracing::warn!("Message change stream error: {}", e);
                    None
                }
            }
        });
        Ok(Box::pin(changes))
    }
}
