//! High-level builder API for chat sessions

use anyhow::{Context, Result};
use nova_coach::{AssistantConfig, CoachAssistant};
use nova_llm::{ClientFactory, GatewayConfig};
use nova_persist::{InMemoryBackend, MessageRole, PersistenceClient};
use nova_sync::ThreadSync;
use std::sync::Arc;

enum Backend {
    Memory,
    Custom(Arc<dyn PersistenceClient>),
    #[cfg(feature = "http")]
    Http {
        base_url: String,
        token: Option<String>,
    },
    #[cfg(feature = "mongodb")]
    Mongo { uri: String, database: String },
}

/// High-level builder for a [`Session`]
///
/// # Example
///
/// ```rust,no_run
/// use nova::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let session = SessionBuilder::new()
///     .user("user_123")
///     .http("http://localhost:8000")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    user_id: Option<String>,
    backend: Backend,
    gateway_key: Option<String>,
    gateway_url: Option<String>,
    assistant: AssistantConfig,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// In-memory backend, no user and no assistant
    pub fn new() -> Self {
        Self {
            user_id: None,
            backend: Backend::Memory,
            gateway_key: None,
            gateway_url: None,
            assistant: AssistantConfig::default(),
        }
    }

    /// Signed-in user; without one the session stays empty
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.backend = Backend::Memory;
        self
    }

    /// Use an already built backend
    pub fn backend(mut self, backend: Arc<dyn PersistenceClient>) -> Self {
        self.backend = Backend::Custom(backend);
        self
    }

    /// Talk to a running `nova-api` server
    #[cfg(feature = "http")]
    pub fn http(mut self, base_url: impl Into<String>) -> Self {
        self.backend = Backend::Http {
            base_url: base_url.into(),
            token: None,
        };
        self
    }

    /// Bearer token for the auth layer in front of `nova-api`
    #[cfg(feature = "http")]
    pub fn http_token(mut self, token: impl Into<String>) -> Self {
        if let Backend::Http { token: slot, .. } = &mut self.backend {
            *slot = Some(token.into());
        }
        self
    }

    #[cfg(feature = "mongodb")]
    pub fn mongodb(mut self, uri: impl Into<String>, database: impl Into<String>) -> Self {
        self.backend = Backend::Mongo {
            uri: uri.into(),
            database: database.into(),
        };
        self
    }

    /// Enables the coaching assistant
    pub fn gateway_key(mut self, key: impl Into<String>) -> Self {
        self.gateway_key = Some(key.into());
        self
    }

    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.assistant.llm.model = model.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.assistant.system_prompt = prompt.into();
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.assistant.history_limit = limit;
        self
    }

    /// Connect the backend, start syncing and set up the assistant
    pub async fn build(self) -> Result<Session> {
        let persist: Arc<dyn PersistenceClient> = match self.backend {
            Backend::Memory => Arc::new(InMemoryBackend::new()),
            Backend::Custom(backend) => backend,
            #[cfg(feature = "http")]
            Backend::Http { base_url, token } => {
                let mut client = nova_persist::HttpPersistenceClient::new(base_url)
                    .context("Failed to create HTTP backend client")?;
                if let Some(token) = token {
                    client = client.with_bearer_token(token);
                }
                Arc::new(client)
            }
            #[cfg(feature = "mongodb")]
            Backend::Mongo { uri, database } => Arc::new(
                nova_persist::MongoPersistenceClient::connect(&uri, &database)
                    .await
                    .context("Failed to connect to MongoDB")?,
            ),
        };

        let assistant = match self.gateway_key {
            Some(key) => {
                let mut gateway = GatewayConfig::new(key);
                if let Some(url) = self.gateway_url {
                    gateway = gateway.with_base_url(url);
                }
                let client = ClientFactory::create_chat_client(gateway)
                    .context("Failed to create gateway client")?;
                Some(CoachAssistant::with_config(client, self.assistant))
            }
            None => None,
        };

        let sync = ThreadSync::new(Arc::clone(&persist), self.user_id);
        sync.start().await;

        Ok(Session {
            persist,
            sync,
            assistant,
        })
    }
}

/// A signed-in chat: the live thread view plus the optional coach
pub struct Session {
    pub persist: Arc<dyn PersistenceClient>,
    pub sync: ThreadSync,
    pub assistant: Option<CoachAssistant>,
}

impl Session {
    /// Send a line in the selected thread, creating one if none is selected
    ///
    /// Returns the coach's reply when an assistant is configured. Without
    /// one the line is only stored.
    pub async fn chat(&self, content: &str) -> Result<Option<String>> {
        let user_id = self
            .sync
            .user_id()
            .context("No signed-in user")?
            .to_string();

        let selected = self.sync.snapshot().selected;
        let thread_id = match selected {
            Some(id) => id,
            None => self.sync.create_thread(None).await?.id,
        };

        let Some(assistant) = &self.assistant else {
            self.sync
                .add_message(MessageRole::User, content, Some(&thread_id))
                .await?;
            return Ok(None);
        };

        let turn = assistant
            .reply_in_thread(self.persist.as_ref(), &user_id, &thread_id, content)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Assistant turn failed");
                anyhow::anyhow!(e.user_message())
            })?;
        Ok(Some(turn.assistant_message.content))
    }
}
