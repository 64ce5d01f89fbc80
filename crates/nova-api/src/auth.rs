use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header set by the auth layer in front of this service
pub const USER_HEADER: &str = "x-user-id";

/// Identity of the caller; every row a handler touches is scoped to it
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(|user| CurrentUser(user.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}
