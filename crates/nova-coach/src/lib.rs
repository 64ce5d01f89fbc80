mod assistant;
mod context;
mod error;
mod templates;

pub use assistant::{AssistantConfig, CoachAssistant, ThreadReply};
pub use context::ContextWindow;
pub use error::{AssistantError, Result};
pub use templates::{DEFAULT_SYSTEM_PROMPT, TITLE_PROMPT};
