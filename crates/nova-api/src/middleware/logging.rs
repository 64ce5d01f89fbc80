use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::auth::USER_HEADER;

/// Request logging middleware
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let user_id = req
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::warn!(%method, %uri, %status, user_id = %user_id, duration_ms, "Request failed");
    } else {
        tracing::info!(%method, %uri, %status, user_id = %user_id, duration_ms, "Request processed");
    }

    response
}
