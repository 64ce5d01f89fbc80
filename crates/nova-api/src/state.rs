use nova_coach::CoachAssistant;
use nova_persist::PersistenceClient;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub persist: Arc<dyn PersistenceClient>,
    /// Absent when no gateway key is configured
    pub assistant: Option<Arc<CoachAssistant>>,
}

impl AppState {
    pub fn new(
        config: Config,
        persist: Arc<dyn PersistenceClient>,
        assistant: Option<CoachAssistant>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            persist,
            assistant: assistant.map(Arc::new),
        }
    }

    pub fn assistant(&self) -> ApiResult<&CoachAssistant> {
        self.assistant
            .as_deref()
            .ok_or(ApiError::AssistantUnavailable)
    }
}
