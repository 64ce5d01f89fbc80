use futures::StreamExt;
use nova_persist::{
    ChangeStream, Message, MessageRole, NewMessage, PersistenceClient, Thread, ThreadPatch,
};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};
use crate::state::SyncState;

/// Live view of one user's threads and of the selected thread's messages
///
/// User-initiated operations patch local state from the backend's answer
/// right away; the change feeds echo the same rows later and the reducers
/// treat those echoes as no-ops.
pub struct ThreadSync {
    backend: Arc<dyn PersistenceClient>,
    user_id: Option<String>,
    state: Arc<watch::Sender<SyncState>>,
    thread_feed: Mutex<Option<JoinHandle<()>>>,
    message_feed: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadSync {
    /// `user_id` is `None` when nobody is signed in
    pub fn new(backend: Arc<dyn PersistenceClient>, user_id: Option<String>) -> Self {
        let (state, _) = watch::channel(SyncState::new());
        Self {
            backend,
            user_id,
            state: Arc::new(state),
            thread_feed: Mutex::new(None),
            message_feed: Mutex::new(None),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Subscribe to the user's thread feed and load the active threads
    ///
    /// Archived threads are not loaded here; see [`Self::load_archived_threads`].
    pub async fn start(&self) {
        let Some(user_id) = self.user_id.as_deref() else {
            tracing::debug!("No user, thread sync stays empty");
            return;
        };

        // Subscribe before fetching so nothing falls between the two
        match self.backend.subscribe_threads(user_id).await {
            Ok(stream) => {
                let handle = self.spawn_thread_feed(stream);
                if let Some(old) = self.thread_feed.lock().await.replace(handle) {
                    old.abort();
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to subscribe to thread changes"),
        }

        if let Err(e) = self.refresh_threads().await {
            tracing::warn!(error = %e, "Initial thread load failed");
        }
    }

    /// Reload the non-archived threads, most recent first
    ///
    /// The fetched rows are merged with what the thread feed delivered while
    /// the request was in flight.
    pub async fn refresh_threads(&self) -> Result<Vec<Thread>> {
        let Some(user_id) = self.user_id.as_deref() else {
            self.state.send_if_modified(|s| s.set_threads(Vec::new()));
            return Ok(Vec::new());
        };

        let threads = self.backend.list_threads(user_id, false).await?;
        tracing::debug!(count = threads.len(), "Threads loaded");
        self.state.send_if_modified(|s| s.merge_threads(threads.clone()));
        Ok(threads)
    }

    /// Fetch the archived threads; only called when the user asks for them
    pub async fn load_archived_threads(&self) -> Result<Vec<Thread>> {
        let Some(user_id) = self.user_id.as_deref() else {
            return Ok(Vec::new());
        };

        let threads = self.backend.list_threads(user_id, true).await?;
        self.state
            .send_if_modified(|s| s.set_archived_threads(threads.clone()));
        Ok(threads)
    }

    /// Make `thread_id` the active thread, or clear the selection with `None`
    ///
    /// The message feed of the previous selection is torn down. Messages
    /// fetched after the selection moved on again are discarded.
    pub async fn select_thread(&self, thread_id: Option<&str>) -> Result<()> {
        let user_id = match (thread_id, self.user_id.as_deref()) {
            (Some(_), None) => return Err(SyncError::NotAuthenticated),
            (_, user_id) => user_id,
        };
        let thread_id = thread_id.map(str::to_string);

        let mut feed = self.message_feed.lock().await;
        if let Some(handle) = feed.take() {
            handle.abort();
        }
        self.state.send_if_modified(|s| s.select(thread_id.clone()));

        let (Some(user_id), Some(thread_id)) = (user_id, thread_id) else {
            return Ok(());
        };

        let stream = self.backend.subscribe_messages(user_id, &thread_id).await?;
        *feed = Some(self.spawn_message_feed(thread_id.clone(), stream));
        drop(feed);

        let messages = self.backend.list_messages(user_id, &thread_id).await?;
        let applied = self
            .state
            .send_if_modified(|s| s.replace_messages(&thread_id, messages));
        if !applied {
            tracing::debug!(thread_id = %thread_id, "Selection changed during fetch, discarded");
        }
        Ok(())
    }

    /// Create a thread and select it without waiting for the feed
    pub async fn create_thread(&self, title: Option<String>) -> Result<Thread> {
        let user_id = self.require_user()?;

        let thread = self.backend.create_thread(user_id, title).await?;
        tracing::info!(thread_id = %thread.id, "Thread created");

        self.state.send_modify(|s| {
            s.apply_thread_change(nova_types::ChangeEvent::Insert {
                record: thread.clone(),
            });
        });
        self.select_thread(Some(&thread.id)).await?;
        Ok(thread)
    }

    pub async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<Thread> {
        let user_id = self.require_user()?;

        let thread = self
            .backend
            .update_thread(user_id, thread_id, ThreadPatch::title(title))
            .await?;
        self.state.send_modify(|s| {
            s.place_thread(thread.clone());
        });
        Ok(thread)
    }

    /// Archive or restore a thread. Archiving the selected thread clears
    /// the selection and the message list.
    pub async fn set_archived(&self, thread_id: &str, archived: bool) -> Result<Thread> {
        let user_id = self.require_user()?;

        let thread = self
            .backend
            .update_thread(user_id, thread_id, ThreadPatch::archived(archived))
            .await?;

        let was_selected = self.state.borrow().is_selected(thread_id);
        if archived && was_selected {
            self.select_thread(None).await?;
        }
        self.state.send_modify(|s| {
            s.place_thread(thread.clone());
        });
        Ok(thread)
    }

    /// Delete a thread's messages, then the thread itself
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let user_id = self.require_user()?;

        let removed = self.backend.delete_messages(user_id, thread_id).await?;
        self.backend.delete_thread(user_id, thread_id).await?;
        tracing::info!(thread_id, messages = removed, "Thread deleted");

        let was_selected = self.state.borrow().is_selected(thread_id);
        if was_selected {
            self.select_thread(None).await?;
        }
        self.state.send_if_modified(|s| s.remove_thread(thread_id));
        Ok(())
    }

    /// Insert a message into `thread_override`, else the selected thread,
    /// else with no thread at all
    ///
    /// The parent thread's activity is then recorded by the backend, which
    /// increments the message counter atomically.
    pub async fn add_message(
        &self,
        role: MessageRole,
        content: impl Into<String>,
        thread_override: Option<&str>,
    ) -> Result<Message> {
        let user_id = self.require_user()?;

        let selected = self.state.borrow().selected.clone();
        let thread_id = thread_override.map(str::to_string).or(selected);
        let new = NewMessage {
            thread_id: thread_id.clone(),
            role,
            content: content.into(),
        };

        let message = self.backend.insert_message(user_id, new).await?;
        let Some(thread_id) = thread_id else {
            return Ok(message);
        };

        self.state.send_if_modified(|s| {
            s.apply_message_change(
                &thread_id,
                nova_types::ChangeEvent::Insert {
                    record: message.clone(),
                },
            )
        });

        let thread = self.backend.record_activity(user_id, &thread_id).await?;
        self.state.send_modify(|s| {
            s.place_thread(thread);
        });
        Ok(message)
    }

    /// Delete every message of a thread and reset its counter
    pub async fn clear_thread_messages(&self, thread_id: &str) -> Result<Thread> {
        let user_id = self.require_user()?;

        let removed = self.backend.delete_messages(user_id, thread_id).await?;
        let thread = self
            .backend
            .update_thread(user_id, thread_id, ThreadPatch::reset_message_count())
            .await?;
        tracing::info!(thread_id, messages = removed, "Thread cleared");

        self.state.send_modify(|s| {
            if s.is_selected(thread_id) {
                s.messages.clear();
            }
            s.place_thread(thread.clone());
        });
        Ok(thread)
    }

    /// Tear down both subscriptions
    pub async fn shutdown(&self) {
        for feed in [&self.thread_feed, &self.message_feed] {
            if let Some(handle) = feed.lock().await.take() {
                handle.abort();
            }
        }
    }

    fn require_user(&self) -> Result<&str> {
        self.user_id.as_deref().ok_or(SyncError::NotAuthenticated)
    }

    fn spawn_thread_feed(&self, mut stream: ChangeStream<Thread>) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                tracing::debug!(kind = event.kind(), thread_id = event.id(), "Thread change");
                state.send_if_modified(|s| s.apply_thread_change(event));
            }
            tracing::debug!("Thread feed closed");
        })
    }

    fn spawn_message_feed(
        &self,
        thread_id: String,
        mut stream: ChangeStream<Message>,
    ) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                tracing::debug!(kind = event.kind(), message_id = event.id(), "Message change");
                state.send_if_modified(|s| s.apply_message_change(&thread_id, event));
            }
            tracing::debug!(thread_id = %thread_id, "Message feed closed");
        })
    }
}

impl Drop for ThreadSync {
    fn drop(&mut self) {
        for feed in [self.thread_feed.get_mut(), self.message_feed.get_mut()] {
            if let Some(handle) = feed.take() {
                handle.abort();
            }
        }
    }
}
