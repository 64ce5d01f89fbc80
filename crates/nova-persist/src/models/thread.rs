use chrono::{DateTime, Utc};
use nova_types::Record;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_TITLE: &str = "New Conversation";

/// Conversation container owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub last_message_at: Option<DateTime<Utc>>,
    /// Denormalized, maintained by the backend
    pub message_count: u64,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(user_id: impl Into<String>, title: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: Self::normalize_title(title),
            last_message_at: None,
            message_count: 0,
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Blank or missing titles fall back to the default
    pub fn normalize_title(title: Option<String>) -> String {
        title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string())
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_THREAD_TITLE
    }

    /// Most recent first
    pub fn sort_by_recency(threads: &mut [Thread]) {
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}

impl Record for Thread {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial update of a thread. Applying any patch bumps `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u64>,
}

impl ThreadPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn archived(archived: bool) -> Self {
        Self {
            archived: Some(archived),
            ..Self::default()
        }
    }

    pub fn reset_message_count() -> Self {
        Self {
            message_count: Some(0),
            ..Self::default()
        }
    }

    pub fn apply(&self, thread: &mut Thread, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            thread.title = Thread::normalize_title(Some(title.clone()));
        }
        if let Some(archived) = self.archived {
            thread.archived = archived;
        }
        if let Some(count) = self.message_count {
            thread.message_count = count;
        }
        thread.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_title() {
        assert_eq!(Thread::new("u1", None).title, DEFAULT_THREAD_TITLE);
        assert_eq!(Thread::new("u1", Some("   ".to_string())).title, DEFAULT_THREAD_TITLE);
        assert_eq!(Thread::new("u1", Some(" Sleep ".to_string())).title, "Sleep");
    }

    #[test]
    fn test_patch_bumps_updated_at() {
        let mut thread = Thread::new("u1", None);
        let later = thread.updated_at + chrono::Duration::seconds(5);

        ThreadPatch::archived(true).apply(&mut thread, later);

        assert!(thread.archived);
        assert_eq!(thread.updated_at, later);
        assert_eq!(thread.title, DEFAULT_THREAD_TITLE);
    }
}
