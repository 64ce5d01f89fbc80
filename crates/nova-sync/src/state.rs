use nova_persist::{Message, Thread};
use nova_types::ChangeEvent;

/// Everything a chat view renders
///
/// Reducers return whether they changed anything so callers can skip
/// notifying watchers on no-ops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncState {
    /// Non-archived threads, most recent first
    pub threads: Vec<Thread>,
    /// Archived threads, most recent first; empty until loaded
    pub archived_threads: Vec<Thread>,
    pub archived_loaded: bool,
    pub selected: Option<String>,
    /// Messages of the selected thread, oldest first
    pub messages: Vec<Message>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_thread(&self) -> Option<&Thread> {
        let id = self.selected.as_deref()?;
        self.find_thread(id)
    }

    pub fn find_thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads
            .iter()
            .chain(self.archived_threads.iter())
            .find(|t| t.id == thread_id)
    }

    pub fn is_selected(&self, thread_id: &str) -> bool {
        self.selected.as_deref() == Some(thread_id)
    }

    pub fn set_threads(&mut self, threads: Vec<Thread>) -> bool {
        if self.threads == threads {
            return false;
        }
        self.threads = threads;
        true
    }

    /// Install a fetched active-thread list without losing feed changes
    ///
    /// Rows the feed delivered while the fetch was in flight are kept, and
    /// for a row known on both sides the newer `updated_at` wins.
    pub fn merge_threads(&mut self, fetched: Vec<Thread>) -> bool {
        let mut merged: Vec<Thread> = Vec::with_capacity(fetched.len());
        for row in fetched {
            match self.find_thread(&row.id) {
                Some(local) if local.updated_at > row.updated_at => {
                    if !local.archived {
                        merged.push(local.clone());
                    }
                }
                _ => merged.push(row),
            }
        }
        for local in &self.threads {
            if !merged.iter().any(|t| t.id == local.id) {
                merged.push(local.clone());
            }
        }
        Thread::sort_by_recency(&mut merged);

        let archived_before = self.archived_threads.len();
        self.archived_threads
            .retain(|a| !merged.iter().any(|t| t.id == a.id));
        let archived_changed = self.archived_threads.len() != archived_before;

        self.set_threads(merged) || archived_changed
    }

    pub fn set_archived_threads(&mut self, threads: Vec<Thread>) -> bool {
        self.archived_threads = threads;
        self.archived_loaded = true;
        true
    }

    /// Change the active thread. Switching threads drops the old messages.
    pub fn select(&mut self, thread_id: Option<String>) -> bool {
        if self.selected == thread_id {
            return false;
        }
        self.selected = thread_id;
        self.messages.clear();
        true
    }

    /// Install fetched messages unless the selection moved on meanwhile
    ///
    /// Messages the feed already delivered for this thread stay, since the
    /// fetch may have been taken before they were stored.
    pub fn replace_messages(&mut self, thread_id: &str, messages: Vec<Message>) -> bool {
        if !self.is_selected(thread_id) {
            return false;
        }
        let mut merged = messages;
        for message in self.messages.drain(..) {
            if message.belongs_to(thread_id) && !merged.iter().any(|m| m.id == message.id) {
                merged.push(message);
            }
        }
        merged.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        self.messages = merged;
        true
    }

    /// Put a confirmed row into the list matching its archived flag
    pub fn place_thread(&mut self, thread: Thread) -> bool {
        self.take_thread(&thread.id);
        if thread.archived && self.is_selected(&thread.id) {
            self.select(None);
        }
        let list = self.list_for(thread.archived);
        list.push(thread);
        Thread::sort_by_recency(list);
        true
    }

    /// Drop a thread from both lists, clearing the selection if it was active
    pub fn remove_thread(&mut self, thread_id: &str) -> bool {
        let removed = self.take_thread(thread_id).is_some();
        let deselected = self.is_selected(thread_id) && self.select(None);
        removed || deselected
    }

    /// Apply a thread change from the feed
    ///
    /// Rows older than the local copy are echoes of writes already applied
    /// and are dropped, so the newest `updated_at` wins. A row identical to
    /// the local copy is a no-op; one with the same `updated_at` but other
    /// content is applied.
    pub fn apply_thread_change(&mut self, event: ChangeEvent<Thread>) -> bool {
        let (record, is_insert) = match event {
            ChangeEvent::Insert { record } => (record, true),
            ChangeEvent::Update { record } => (record, false),
            ChangeEvent::Delete { id } => return self.remove_thread(&id),
        };

        let stale = self
            .find_thread(&record.id)
            .map(|local| *local == record || local.updated_at > record.updated_at);

        match stale {
            Some(true) => false,
            Some(false) => self.place_thread(record),
            None if is_insert => {
                self.list_for(record.archived).insert(0, record);
                true
            }
            None => self.place_thread(record),
        }
    }

    /// Apply a message change seen on the feed of `thread_id`
    ///
    /// Changes for any thread other than the selected one are ignored.
    pub fn apply_message_change(&mut self, thread_id: &str, event: ChangeEvent<Message>) -> bool {
        if !self.is_selected(thread_id) {
            return false;
        }
        match event {
            ChangeEvent::Insert { record } | ChangeEvent::Update { record } => {
                if !record.belongs_to(thread_id) || self.messages.iter().any(|m| m.id == record.id) {
                    return false;
                }
                self.messages.push(record);
                // Stable, so same-instant messages keep arrival order
                self.messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
                true
            }
            ChangeEvent::Delete { id } => {
                let before = self.messages.len();
                self.messages.retain(|m| m.id != id);
                self.messages.len() != before
            }
        }
    }

    fn list_for(&mut self, archived: bool) -> &mut Vec<Thread> {
        if archived {
            &mut self.archived_threads
        } else {
            &mut self.threads
        }
    }

    fn take_thread(&mut self, thread_id: &str) -> Option<Thread> {
        for list in [&mut self.threads, &mut self.archived_threads] {
            if let Some(pos) = list.iter().position(|t| t.id == thread_id) {
                return Some(list.remove(pos));
            }
        }
        None
    }
}
