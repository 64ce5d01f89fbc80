pub mod models;
pub mod error;
pub mod trait_client;
pub mod dbs;

pub use models::{
    Message, MessageRole, NewMessage, Thread, ThreadPatch, DEFAULT_THREAD_TITLE,
};
pub use error::{PersistError, Result};
pub use trait_client::{ChangeStream, PersistenceClient};
pub use dbs::memory::InMemoryBackend;
#[cfg(feature = "mongodb")]
pub use dbs::mongo::MongoPersistenceClient;
#[cfg(feature = "http")]
pub use dbs::http::HttpPersistenceClient;
pub use nova_types::ChangeEvent;
