mod message;
mod thread;

pub use message::{Message, MessageRole, NewMessage};
pub use thread::{Thread, ThreadPatch, DEFAULT_THREAD_TITLE};
