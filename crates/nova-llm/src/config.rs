use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::gateway::GatewayClient;
use crate::traits::ChatClient;

pub const DEFAULT_GATEWAY_URL: &str = "https://api.openai.com/v1";

/// Connection settings for an OpenAI-compatible gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

impl GatewayConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct ClientFactory;

impl ClientFactory {
    pub fn create_chat_client(config: GatewayConfig) -> Result<Arc<dyn ChatClient>> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::Config("gateway api key is empty".to_string()));
        }
        let client = GatewayClient::new(config.api_key)?.with_base_url(config.base_url);
        Ok(Arc::new(client))
    }
}
