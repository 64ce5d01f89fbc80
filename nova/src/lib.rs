//! # Nova - realtime coaching chat
//!
//! Nova keeps a live, ordered view of a user's conversation threads and of
//! the selected thread's messages, backed by a storage backend with a
//! row-level change feed, and answers through an LLM coaching assistant.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nova::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = SessionBuilder::new()
//!         .user("user_123")
//!         .in_memory()
//!         .gateway_key(std::env::var("LLM_GATEWAY_API_KEY")?)
//!         .build()
//!         .await?;
//!
//!     if let Some(reply) = session.chat("How can I sleep better?").await? {
//!         println!("{}", reply);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **nova-types**: change events and LLM settings
//! - **nova-persist**: data model, `PersistenceClient` and its backends
//!   (in-memory, MongoDB, HTTP)
//! - **nova-sync**: `ThreadSync`, the client-side mirror
//! - **nova-llm**: gateway client with function calling
//! - **nova-coach**: the coaching assistant
//!
//! ## Features
//!
//! - `http` (default): HTTP backend talking to `nova-api`
//! - `mongodb`: MongoDB backend

// Re-export all public APIs
pub use nova_coach as coach;
pub use nova_llm as llm;
pub use nova_persist as persist;
pub use nova_sync as sync;
pub use nova_types as types;

// Re-export commonly used types
pub use nova_coach::{AssistantConfig, CoachAssistant};
pub use nova_persist::{
    InMemoryBackend, Message, MessageRole, PersistenceClient, Thread, DEFAULT_THREAD_TITLE,
};
pub use nova_sync::{SyncState, ThreadSync};
pub use nova_types::{ChangeEvent, LLMConfig};

/// High-level builder for a chat session
pub mod builder;

pub use builder::{Session, SessionBuilder};

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{Session, SessionBuilder};
    pub use crate::persist::{Message, MessageRole, Thread};
    pub use crate::sync::SyncState;
    pub use anyhow::Result;
}
