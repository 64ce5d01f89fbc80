use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(skip)]
    pub mongodb_uri: Option<String>,
    #[serde(skip)]
    pub llm_gateway_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            database: default_database(),
        }
    }
}

fn default_database() -> String {
    "nova".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Stored messages sent with each assistant request
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Gateway URL; the client default applies when unset
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let defaults = nova_types::LLMConfig::default();
        Self {
            model: defaults.model,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            history_limit: default_history_limit(),
            base_url: None,
        }
    }
}

fn default_history_limit() -> usize {
    20
}

impl From<LlmConfig> for nova_types::LLMConfig {
    fn from(config: LlmConfig) -> Self {
        Self {
            model: config.model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `NOVA_` environment variables, `__` between levels
    ///    (e.g. `NOVA_SERVER__PORT=9000`)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("NOVA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.load_secrets();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }

    /// Whether the assistant endpoint can be served
    pub fn assistant_enabled(&self) -> bool {
        self.llm_gateway_api_key.is_some()
    }

    fn load_secrets(&mut self) {
        self.mongodb_uri = non_empty_env("MONGODB_URI");
        self.llm_gateway_api_key = non_empty_env("LLM_GATEWAY_API_KEY");
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Mongodb && self.mongodb_uri.is_none() {
            return Err(ConfigError::Message(
                "MONGODB_URI environment variable is required for the mongodb backend".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
