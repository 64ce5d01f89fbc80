use nova_llm::GatewayError;
use nova_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Gateway rate limit exceeded")]
    RateLimited,

    #[error("Gateway quota exhausted")]
    QuotaExhausted,

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Gateway error: {0}")]
    Gateway(GatewayError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

impl From<GatewayError> for AssistantError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::RateLimited => Self::RateLimited,
            GatewayError::QuotaExhausted => Self::QuotaExhausted,
            other => Self::Gateway(other),
        }
    }
}

impl AssistantError {
    /// Short text suitable for a toast in the chat view
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited => "Nova is getting a lot of requests. Please try again in a moment.",
            Self::QuotaExhausted => "The AI usage limit has been reached. Please check your plan.",
            Self::ThreadNotFound(_) => "This conversation no longer exists.",
            Self::EmptyReply | Self::Gateway(_) | Self::Persist(_) => {
                "Something went wrong. Please try again."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
