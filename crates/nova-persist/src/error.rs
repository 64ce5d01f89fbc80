use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backend returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid object ID: {0}")]
    InvalidObjectId(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    /// Stable machine-readable code, shared with the HTTP API
    pub fn code(&self) -> &'static str {
        match self {
            Self::ThreadNotFound(_) => "thread_not_found",
            Self::MessageNotFound(_) => "message_not_found",
            Self::InvalidObjectId(_) => "invalid_id",
            Self::Conflict(_) => "conflict",
            Self::Database(_) => "database",
            Self::Http(_) => "http",
            Self::Upstream { .. } => "upstream",
            Self::Decode(_) => "decode",
            Self::Connection(_) => "connection",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for PersistError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(feature = "mongodb")]
impl From<bson::ser::Error> for PersistError {
    fn from(err: bson::ser::Error) -> Self {
        Self::Database(format!("BSON serialization: {}", err))
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for PersistError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;
