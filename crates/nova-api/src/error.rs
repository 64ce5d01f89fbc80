use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use nova_coach::AssistantError;
use nova_persist::PersistError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Missing or empty x-user-id header")]
    Unauthorized,

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Assistant rate limit exceeded")]
    RateLimited,

    #[error("Assistant quota exhausted")]
    QuotaExhausted,

    #[error("Assistant is not configured")]
    AssistantUnavailable,

    #[error("Persistence error: {0}")]
    Persist(PersistError),

    #[error("Assistant error: {0}")]
    Assistant(AssistantError),
}

/// JSON body of every error response
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::ThreadNotFound(_) | Self::MessageNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::QuotaExhausted => StatusCode::PAYMENT_REQUIRED,
            Self::AssistantUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persist(_) | Self::Assistant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code; the HTTP backend client maps these back
    ///
    /// Storage failures carry the code of the underlying `PersistError`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::ThreadNotFound(_) => "thread_not_found",
            Self::MessageNotFound(_) => "message_not_found",
            Self::InvalidId(_) => PersistError::InvalidObjectId(String::new()).code(),
            Self::Conflict(_) => "conflict",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::AssistantUnavailable => "assistant_unavailable",
            Self::Persist(e) => e.code(),
            Self::Assistant(_) => "internal",
        }
    }
}

impl From<PersistError> for ApiError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::ThreadNotFound(id) => Self::ThreadNotFound(id),
            PersistError::MessageNotFound(id) => Self::MessageNotFound(id),
            PersistError::InvalidObjectId(id) => Self::InvalidId(id),
            PersistError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Persist(other),
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::RateLimited => Self::RateLimited,
            AssistantError::QuotaExhausted => Self::QuotaExhausted,
            AssistantError::ThreadNotFound(id) => Self::ThreadNotFound(id),
            AssistantError::Persist(e) => e.into(),
            other => Self::Assistant(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Persist(e) => {
                tracing::error!(error = %e, "Persistence error");
                "Storage error".to_string()
            }
            Self::Assistant(e) => {
                tracing::error!(error = %e, "Assistant error");
                e.user_message().to_string()
            }
            Self::RateLimited => AssistantError::RateLimited.user_message().to_string(),
            Self::QuotaExhausted => AssistantError::QuotaExhausted.user_message().to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorBody {
            error: message,
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_errors_keep_their_meaning() {
        let err: ApiError = PersistError::ThreadNotFound("t1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "thread_not_found");

        let err: ApiError = PersistError::Conflict("taken".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: ApiError = PersistError::Internal("boom".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal");

        let err: ApiError = PersistError::InvalidObjectId("nope".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), PersistError::InvalidObjectId("nope".into()).code());

        let err: ApiError = PersistError::Database("down".into()).into();
        assert_eq!(err.code(), "database");
    }

    #[test]
    fn test_gateway_limits_map_to_distinct_statuses() {
        let rate: ApiError = AssistantError::RateLimited.into();
        let quota: ApiError = AssistantError::QuotaExhausted.into();

        assert_eq!(rate.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(quota.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError::BadRequest("Test error".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
