use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nova_persist::{
    ChangeStream, InMemoryBackend, Message, MessageRole, NewMessage, PersistenceClient, Thread,
    ThreadPatch, DEFAULT_THREAD_TITLE,
};
use nova_sync::{SyncError, SyncState, ThreadSync};

const TIMEOUT: Duration = Duration::from_secs(2);

fn setup() -> (Arc<InMemoryBackend>, ThreadSync) {
    let backend = Arc::new(InMemoryBackend::new());
    let sync = ThreadSync::new(backend.clone(), Some("alice".to_string()));
    (backend, sync)
}

/// In-memory backend that records call order and can simulate a message
/// stored by another client while a message listing is in flight
#[derive(Default)]
struct RecordingBackend {
    inner: InMemoryBackend,
    calls: Mutex<Vec<&'static str>>,
    insert_during_list: bool,
}

impl RecordingBackend {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceClient for RecordingBackend {
    async fn list_threads(&self, user_id: &str, archived: bool) -> nova_persist::Result<Vec<Thread>> {
        self.record("list_threads");
        self.inner.list_threads(user_id, archived).await
    }

    async fn get_thread(&self, user_id: &str, thread_id: &str) -> nova_persist::Result<Option<Thread>> {
        self.record("get_thread");
        self.inner.get_thread(user_id, thread_id).await
    }

    async fn create_thread(&self, user_id: &str, title: Option<String>) -> nova_persist::Result<Thread> {
        self.record("create_thread");
        self.inner.create_thread(user_id, title).await
    }

    async fn update_thread(
        &self,
        user_id: &str,
        thread_id: &str,
        patch: ThreadPatch,
    ) -> nova_persist::Result<Thread> {
        self.record("update_thread");
        self.inner.update_thread(user_id, thread_id, patch).await
    }

    async fn record_activity(&self, user_id: &str, thread_id: &str) -> nova_persist::Result<Thread> {
        self.record("record_activity");
        self.inner.record_activity(user_id, thread_id).await
    }

    async fn delete_thread(&self, user_id: &str, thread_id: &str) -> nova_persist::Result<()> {
        self.record("delete_thread");
        self.inner.delete_thread(user_id, thread_id).await
    }

    async fn list_messages(&self, user_id: &str, thread_id: &str) -> nova_persist::Result<Vec<Message>> {
        self.record("list_messages");
        let snapshot = self.inner.list_messages(user_id, thread_id).await?;
        if self.insert_during_list {
            self.inner
                .insert_message(user_id, NewMessage::user("from other tab").in_thread(thread_id))
                .await?;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(snapshot)
    }

    async fn insert_message(&self, user_id: &str, message: NewMessage) -> nova_persist::Result<Message> {
        self.record("insert_message");
        self.inner.insert_message(user_id, message).await
    }

    async fn attach_message(
        &self,
        user_id: &str,
        message_id: &str,
        thread_id: &str,
    ) -> nova_persist::Result<Message> {
        self.record("attach_message");
        self.inner.attach_message(user_id, message_id, thread_id).await
    }

    async fn delete_messages(&self, user_id: &str, thread_id: &str) -> nova_persist::Result<u64> {
        self.record("delete_messages");
        self.inner.delete_messages(user_id, thread_id).await
    }

    async fn subscribe_threads(&self, user_id: &str) -> nova_persist::Result<ChangeStream<Thread>> {
        self.inner.subscribe_threads(user_id).await
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
        thread_id: &str,
    ) -> nova_persist::Result<ChangeStream<Message>> {
        self.inner.subscribe_messages(user_id, thread_id).await
    }
}

async fn wait_until(sync: &ThreadSync, check: impl FnMut(&SyncState) -> bool) -> SyncState {
    let mut rx = sync.watch();
    let state = tokio::time::timeout(TIMEOUT, rx.wait_for(check))
        .await
        .expect("state never reached")
        .expect("sync dropped");
    state.clone()
}

#[tokio::test]
async fn test_unauthenticated_lists_are_empty() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.create_thread("alice", None).await.unwrap();
    let sync = ThreadSync::new(backend, None);

    sync.start().await;
    assert!(sync.refresh_threads().await.unwrap().is_empty());
    assert!(sync.load_archived_threads().await.unwrap().is_empty());
    assert!(matches!(
        sync.create_thread(None).await,
        Err(SyncError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_start_loads_active_threads_only() {
    let (backend, sync) = setup();
    let active = backend.create_thread("alice", Some("Sleep".into())).await.unwrap();
    let archived = backend.create_thread("alice", Some("Old".into())).await.unwrap();
    backend
        .update_thread("alice", &archived.id, nova_persist::ThreadPatch::archived(true))
        .await
        .unwrap();
    backend.create_thread("bob", None).await.unwrap();

    sync.start().await;

    let state = sync.snapshot();
    assert_eq!(state.threads.len(), 1);
    assert_eq!(state.threads[0].id, active.id);
    assert!(!state.archived_loaded);
    assert!(state.archived_threads.is_empty());

    sync.load_archived_threads().await.unwrap();
    let state = sync.snapshot();
    assert!(state.archived_loaded);
    assert_eq!(state.archived_threads[0].id, archived.id);
}

#[tokio::test]
async fn test_create_thread_selects_immediately() {
    let (_backend, sync) = setup();
    sync.start().await;

    let thread = sync.create_thread(None).await.unwrap();

    let state = sync.snapshot();
    assert_eq!(thread.title, DEFAULT_THREAD_TITLE);
    assert_eq!(state.threads[0].id, thread.id);
    assert_eq!(state.selected.as_deref(), Some(thread.id.as_str()));
    assert!(state.messages.is_empty());

    // The feed echo must not duplicate the optimistic row
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sync.snapshot().threads.len(), 1);
}

#[tokio::test]
async fn test_select_replaces_messages_in_creation_order() {
    let (backend, sync) = setup();
    let a = backend.create_thread("alice", None).await.unwrap();
    let b = backend.create_thread("alice", None).await.unwrap();
    for content in ["first", "second", "third"] {
        backend
            .insert_message("alice", NewMessage::user(content).in_thread(&a.id))
            .await
            .unwrap();
    }
    backend
        .insert_message("alice", NewMessage::user("other").in_thread(&b.id))
        .await
        .unwrap();
    sync.start().await;

    sync.select_thread(Some(&a.id)).await.unwrap();
    let contents: Vec<String> = sync.snapshot().messages.into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["first", "second", "third"]);

    sync.select_thread(Some(&b.id)).await.unwrap();
    let contents: Vec<String> = sync.snapshot().messages.into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["other"]);

    sync.select_thread(None).await.unwrap();
    let state = sync.snapshot();
    assert!(state.selected.is_none());
    assert!(state.messages.is_empty());
}

#[tokio::test]
async fn test_message_feed_only_touches_selected_thread() {
    let (backend, sync) = setup();
    let a = backend.create_thread("alice", None).await.unwrap();
    let b = backend.create_thread("alice", None).await.unwrap();
    sync.start().await;
    sync.select_thread(Some(&a.id)).await.unwrap();

    backend
        .insert_message("alice", NewMessage::user("elsewhere").in_thread(&b.id))
        .await
        .unwrap();
    backend
        .insert_message("alice", NewMessage::assistant("here").in_thread(&a.id))
        .await
        .unwrap();

    let state = wait_until(&sync, |s| !s.messages.is_empty()).await;
    assert_eq!(state.messages.len(), 1);
    assert_eq!(state.messages[0].content, "here");

    // Give a stray event time to land before checking again
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sync.snapshot().messages.len(), 1);
}

#[tokio::test]
async fn test_add_message_records_activity() {
    let (backend, sync) = setup();
    sync.start().await;
    let thread = sync.create_thread(None).await.unwrap();

    sync.add_message(MessageRole::User, "How did I sleep?", None)
        .await
        .unwrap();
    sync.add_message(MessageRole::Assistant, "Seven hours.", None)
        .await
        .unwrap();

    let stored = backend.get_thread("alice", &thread.id).await.unwrap().unwrap();
    assert_eq!(stored.message_count, 2);
    assert!(stored.last_message_at.is_some());

    let state = wait_until(&sync, |s| s.messages.len() == 2).await;
    assert_eq!(state.threads[0].message_count, 2);
}

#[tokio::test]
async fn test_add_message_with_override_and_without_thread() {
    let (backend, sync) = setup();
    sync.start().await;
    let target = backend.create_thread("alice", None).await.unwrap();

    let loose = sync
        .add_message(MessageRole::User, "before any thread", None)
        .await
        .unwrap();
    assert!(loose.thread_id.is_none());

    let placed = sync
        .add_message(MessageRole::User, "into target", Some(&target.id))
        .await
        .unwrap();
    assert!(placed.belongs_to(&target.id));
    assert!(sync.snapshot().messages.is_empty());

    let stored = backend.get_thread("alice", &target.id).await.unwrap().unwrap();
    assert_eq!(stored.message_count, 1);
}

#[tokio::test]
async fn test_concurrent_adds_are_all_counted() {
    let backend = Arc::new(InMemoryBackend::new());
    let thread = backend.create_thread("alice", None).await.unwrap();

    // Two clients on the same account, like two open tabs
    let first = ThreadSync::new(backend.clone(), Some("alice".to_string()));
    let second = ThreadSync::new(backend.clone(), Some("alice".to_string()));

    let (a, b) = tokio::join!(
        first.add_message(MessageRole::User, "from tab one", Some(&thread.id)),
        second.add_message(MessageRole::User, "from tab two", Some(&thread.id)),
    );
    a.unwrap();
    b.unwrap();

    let stored = backend.get_thread("alice", &thread.id).await.unwrap().unwrap();
    assert_eq!(stored.message_count, 2);
}

#[tokio::test]
async fn test_rename_patches_local_state() {
    let (_backend, sync) = setup();
    sync.start().await;
    let thread = sync.create_thread(None).await.unwrap();

    sync.rename_thread(&thread.id, "Recovery plan").await.unwrap();

    assert_eq!(sync.snapshot().threads[0].title, "Recovery plan");
}

#[tokio::test]
async fn test_archive_selected_clears_selection() {
    let (_backend, sync) = setup();
    sync.start().await;
    let thread = sync.create_thread(None).await.unwrap();
    sync.add_message(MessageRole::User, "hello", None).await.unwrap();

    sync.set_archived(&thread.id, true).await.unwrap();

    let state = wait_until(&sync, |s| s.threads.is_empty()).await;
    assert!(state.selected.is_none());
    assert!(state.messages.is_empty());
    assert!(state.threads.is_empty());
    assert_eq!(state.archived_threads[0].id, thread.id);

    sync.set_archived(&thread.id, false).await.unwrap();
    let state = wait_until(&sync, |s| s.archived_threads.is_empty()).await;
    assert_eq!(state.threads[0].id, thread.id);
    assert!(state.archived_threads.is_empty());
}

#[tokio::test]
async fn test_delete_thread_removes_messages_first() {
    let (backend, sync) = setup();
    sync.start().await;
    let thread = sync.create_thread(None).await.unwrap();
    sync.add_message(MessageRole::User, "one", None).await.unwrap();
    sync.add_message(MessageRole::User, "two", None).await.unwrap();

    sync.delete_thread(&thread.id).await.unwrap();

    assert!(backend.get_thread("alice", &thread.id).await.unwrap().is_none());
    // Messages are gone too, not orphaned
    let stray = backend.list_messages("alice", &thread.id).await.unwrap();
    assert!(stray.is_empty());

    let state = wait_until(&sync, |s| s.threads.is_empty()).await;
    assert!(state.selected.is_none());
    assert!(state.messages.is_empty());
}

#[tokio::test]
async fn test_delete_thread_calls_backend_in_order() {
    let backend = Arc::new(RecordingBackend::default());
    let sync = ThreadSync::new(backend.clone(), Some("alice".to_string()));
    let thread = sync.create_thread(None).await.unwrap();
    sync.add_message(MessageRole::User, "one", None).await.unwrap();

    sync.delete_thread(&thread.id).await.unwrap();

    let calls = backend.calls();
    let messages_at = calls.iter().position(|c| *c == "delete_messages").unwrap();
    let thread_at = calls.iter().position(|c| *c == "delete_thread").unwrap();
    assert!(messages_at < thread_at, "unexpected call order: {:?}", calls);
}

#[tokio::test]
async fn test_select_keeps_message_stored_during_fetch() {
    let backend = Arc::new(RecordingBackend {
        insert_during_list: true,
        ..RecordingBackend::default()
    });
    let thread = backend.inner.create_thread("alice", None).await.unwrap();
    let sync = ThreadSync::new(backend.clone(), Some("alice".to_string()));
    sync.start().await;

    sync.select_thread(Some(&thread.id)).await.unwrap();

    let stored = backend.inner.list_messages("alice", &thread.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    let state = wait_until(&sync, |s| s.messages.len() == 1).await;
    assert_eq!(state.messages[0].content, "from other tab");
}

#[tokio::test]
async fn test_clear_thread_messages_resets_counter() {
    let (backend, sync) = setup();
    sync.start().await;
    let thread = sync.create_thread(None).await.unwrap();
    sync.add_message(MessageRole::User, "one", None).await.unwrap();

    let cleared = sync.clear_thread_messages(&thread.id).await.unwrap();

    assert_eq!(cleared.message_count, 0);
    wait_until(&sync, |s| s.messages.is_empty() && s.threads[0].message_count == 0).await;
    assert!(backend.list_messages("alice", &thread.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_thread_feed_reflects_remote_changes() {
    let (backend, sync) = setup();
    sync.start().await;

    // Another client creates, then deletes, a thread
    let remote = backend.create_thread("alice", Some("Remote".into())).await.unwrap();
    let state = wait_until(&sync, |s| s.threads.iter().any(|t| t.id == remote.id)).await;
    assert_eq!(state.threads[0].title, "Remote");

    backend.delete_thread("alice", &remote.id).await.unwrap();
    wait_until(&sync, |s| s.threads.is_empty()).await;

    sync.shutdown().await;
}
