use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Reports the backend connection and whether the assistant is configured.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut services = HashMap::new();

    let backend = match state.persist.list_threads("_health_check", false).await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Backend health check failed");
            "disconnected"
        }
    };
    services.insert("backend".to_string(), backend.to_string());

    let assistant = if state.assistant.is_some() {
        "configured"
    } else {
        "disabled"
    };
    services.insert("assistant".to_string(), assistant.to_string());

    let status = if backend == "connected" { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    })
}
