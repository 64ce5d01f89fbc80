pub mod config;
pub mod events;

pub use config::LLMConfig;
pub use events::{ChangeEvent, Record};
