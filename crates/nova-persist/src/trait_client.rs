use async_trait::async_trait;
use futures::Stream;
use nova_types::ChangeEvent;
use std::pin::Pin;

use crate::error::Result;
use crate::models::{Message, NewMessage, Thread, ThreadPatch};

/// Push channel of row-level changes
pub type ChangeStream<T> = Pin<Box<dyn Stream<Item = ChangeEvent<T>> + Send>>;

/// Storage operations for threads and messages
///
/// Every call carries the acting user. Implementations only expose and
/// mutate rows owned by that user.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Threads with the given archived flag, most recent first
    async fn list_threads(&self, user_id: &str, archived: bool) -> Result<Vec<Thread>>;

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> Result<Option<Thread>>;

    /// Create a thread, falling back to the default title
    async fn create_thread(&self, user_id: &str, title: Option<String>) -> Result<Thread>;

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> Result<Thread>;

    /// Bump `last_message_at` and increment `message_count` in one atomic step
    async fn record_activity(&self, user_id: &str, thread_id: &str) -> Result<Thread>;

    /// Delete the thread row only; callers remove its messages first
    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()>;

    /// Messages of a thread, oldest first
    async fn list_messages(&self, user_id: &str, thread_id: &str) -> Result<Vec<Message>>;

    async fn insert_message(&self, user_id: &str, message: NewMessage) -> Result<Message>;

    /// Attach a thread-less message to a thread
    async fn attach_message(
        &self,
        user_id: &str,
        message_id: &str,
        thread_id: &str,
    ) -> Result<Message>;

    /// Delete every message of a thread, returning how many were removed
    async fn delete_messages(&self, user_id: &str, thread_id: &str) -> Result<u64>;

    /// Thread changes for one user
    async fn subscribe_threads(&self, user_id: &str) -> Result<ChangeStream<Thread>>;

    /// Message inserts and deletes for one thread
    async fn subscribe_messages(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> Result<ChangeStream<Message>>;
}
