use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP 429 from the gateway
    #[error("Rate limit exceeded")]
    RateLimited,

    /// HTTP 402 from the gateway
    #[error("Usage quota exhausted")]
    QuotaExhausted,

    #[error("Gateway error ({status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Response has no `{0}` tool call")]
    MissingToolCall(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Map a non-success status to its error
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::PAYMENT_REQUIRED => Self::QuotaExhausted,
            _ => Self::Upstream {
                status: status.as_u16(),
                body,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            GatewayError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            GatewayError::RateLimited
        ));
        assert!(matches!(
            GatewayError::from_status(StatusCode::PAYMENT_REQUIRED, String::new()),
            GatewayError::QuotaExhausted
        ));
        match GatewayError::from_status(StatusCode::BAD_GATEWAY, "upstream down".to_string()) {
            GatewayError::Upstream { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
