mod feed;

use async_trait::async_trait;
use chrono::Utc;
use nova_types::ChangeEvent;
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Message, NewMessage, Thread, ThreadPatch};
use crate::trait_client::{ChangeStream, PersistenceClient};
use feed::ChangeFeed;

const FEED_CAPACITY: usize = 256;

#[derive(Default)]
struct Tables {
    /// Insertion order
    threads: Vec<Thread>,
    /// Insertion order, which is also creation order
    messages: Vec<Message>,
}

impl Tables {
    fn owned_thread(&self, user_id: &str, thread_id: &str) -> Option<&Thread> {
        self.threads
            .iter()
            .find(|t| t.id == thread_id && t.user_id == user_id)
    }

    fn owned_thread_mut(&mut self, user_id: &str, thread_id: &str) -> Result<&mut Thread> {
        self.threads
            .iter_mut()
            .find(|t| t.id == thread_id && t.user_id == user_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))
    }
}

/// Process-local backend with a broadcast change feed
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
    threads_feed: ChangeFeed<Thread>,
    messages_feed: ChangeFeed<Message>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            threads_feed: ChangeFeed::new(FEED_CAPACITY),
            messages_feed: ChangeFeed::new(FEED_CAPACITY),
        }
    }

    fn publish_thread(&self, thread: &Thread, event: ChangeEvent<Thread>) {
        self.threads_feed.publish(&thread.user_id, None, event);
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceClient for InMemoryBackend {
    async fn list_threads(&self, user_id: &str, archived: bool) -> Result<Vec<Thread>> {
        let tables = self.tables.read().await;
        // Newest inserts first so ties in `updated_at` keep the newest on top
        let mut threads: Vec<Thread> = tables
            .threads
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id && t.archived == archived)
            .cloned()
            .collect();
        Thread::sort_by_recency(&mut threads);
        Ok(threads)
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables.owned_thread(user_id, thread_id).cloned())
    }

    async fn create_thread(&self, user_id: &str, title: Option<String>) -> Result<Thread> {
        let thread = Thread::new(user_id, title);
        self.tables.write().await.threads.push(thread.clone());

        tracing::debug!(thread_id = %thread.id, user_id, "Thread created");
        self.publish_thread(&thread, ChangeEvent::Insert { record: thread.clone() });
        Ok(thread)
    }

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> Result<Thread> {
        let updated = {
            let mut tables = self.tables.write().await;
            let thread = tables.owned_thread_mut(user_id, thread_id)?;
            patch.apply(thread, Utc::now());
            thread.clone()
        };

        self.publish_thread(&updated, ChangeEvent::Update { record: updated.clone() });
        Ok(updated)
    }

    async fn record_activity(&self, user_id: &str, thread_id: &str) -> Result<Thread> {
        let updated = {
            let mut tables = self.tables.write().await;
            let thread = tables.owned_thread_mut(user_id, thread_id)?;
            let now = Utc::now();
            thread.message_count += 1;
            thread.last_message_at = Some(now);
            thread.updated_at = now;
            thread.clone()
        };

        self.publish_thread(&updated, ChangeEvent::Update { record: updated.clone() });
        Ok(updated)
    }

    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        {
            let mut tables = self.tables.write().await;
            let before = tables.threads.len();
            tables
                .threads
                .retain(|t| !(t.id == thread_id && t.user_id == user_id));
            if tables.threads.len() == before {
                return Err(PersistError::ThreadNotFound(thread_id.to_string()));
            }
        }

        tracing::debug!(thread_id, user_id, "Thread deleted");
        self.threads_feed.publish(
            user_id,
            None,
            ChangeEvent::Delete { id: thread_id.to_string() },
        );
        Ok(())
    }

    async fn list_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.user_id == user_id && m.belongs_to(thread_id))
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn insert_message(&self, user_id: &str, message: NewMessage) -> Result<Message> {
        let message = Message::from_new(user_id, message);
        {
            let mut tables = self.tables.write().await;
            if let Some(thread_id) = &message.thread_id {
                if tables.owned_thread(user_id, thread_id).is_none() {
                    return Err(PersistError::ThreadNotFound(thread_id.clone()));
                }
            }
            tables.messages.push(message.clone());
        }

        self.messages_feed.publish(
            user_id,
            message.thread_id.as_deref(),
            ChangeEvent::Insert { record: message.clone() },
        );
        Ok(message)
    }

    async fn attach_message(
        &self,
        user_id: &str,
        message_id: &str,
        thread_id: &str,
    ) -> Result<Message> {
        let attached = {
            let mut tables = self.tables.write().await;
            if tables.owned_thread(user_id, thread_id).is_none() {
                return Err(PersistError::ThreadNotFound(thread_id.to_string()));
            }
            let message = tables
                .messages
                .iter_mut()
                .find(|m| m.id == message_id && m.user_id == user_id)
                .ok_or_else(|| PersistError::MessageNotFound(message_id.to_string()))?;

            match message.thread_id.as_deref() {
                None => message.thread_id = Some(thread_id.to_string()),
                Some(current) if current == thread_id => {}
                Some(current) => {
                    return Err(PersistError::Conflict(format!(
                        "message {} already belongs to thread {}",
                        message_id, current
                    )));
                }
            }
            message.clone()
        };

        // From the thread's point of view the message just appeared
        self.messages_feed.publish(
            user_id,
            Some(thread_id),
            ChangeEvent::Insert { record: attached.clone() },
        );
        Ok(attached)
    }

    async fn delete_messages(&self, user_id: &str, thread_id: &str) -> Result<u64> {
        let removed: Vec<Message> = {
            let mut tables = self.tables.write().await;
            if tables.owned_thread(user_id, thread_id).is_none() {
                return Err(PersistError::ThreadNotFound(thread_id.to_string()));
            }
            let (removed, kept) = std::mem::take(&mut tables.messages)
                .into_iter()
                .partition(|m| m.user_id == user_id && m.belongs_to(thread_id));
            tables.messages = kept;
            removed
        };

        for message in &removed {
            self.messages_feed.publish(
                user_id,
                Some(thread_id),
                ChangeEvent::Delete { id: message.id.clone() },
            );
        }
        Ok(removed.len() as u64)
    }

    async fn subscribe_threads(&self, user_id: &str) -> Result<ChangeStream<Thread>> {
        Ok(self.threads_feed.subscribe(user_id, None))
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> Result<ChangeStream<Message>> {
        Ok(self.messages_feed.subscribe(user_id, Some(thread_id)))
    }
}
