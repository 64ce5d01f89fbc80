pub mod message;
pub mod thread;

pub use message::MongoMessageRepository;
pub use thread::MongoThreadRepository;

use mongodb::bson::doc;
use mongodb::Database;

use crate::error::Result;

pub const THREADS: &str = "threads";
pub const MESSAGES: &str = "messages";

/// Record pre-images on `name` so delete events carry the removed row's
/// owner and thread. Requires MongoDB 6.0 or later.
pub async fn enable_pre_images(db: &Database, name: &str) -> Result<()> {
    let existing = db.list_collection_names().await?;
    let command = if existing.iter().any(|n| n == name) {
        doc! { "collMod": name, "changeStreamPreAndPostImages": { "enabled": true } }
    } else {
        doc! { "create": name, "changeStreamPreAndPostImages": { "enabled": true } }
    };
    db.run_command(command).await?;
    tracing::debug!(collection = name, "Change stream pre-images enabled");
    Ok(())
}
