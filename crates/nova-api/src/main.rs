use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nova_api::{
    build_router,
    config::{BackendKind, Config},
    state::AppState,
};
use nova_coach::{AssistantConfig, CoachAssistant, DEFAULT_SYSTEM_PROMPT};
use nova_llm::{ClientFactory, GatewayConfig};
use nova_persist::{InMemoryBackend, PersistenceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Nova API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let persist = connect_backend(&config).await?;
    let assistant = build_assistant(&config)?;

    let state = Arc::new(AppState::new(config.clone(), persist, assistant));
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("API docs: http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect_backend(config: &Config) -> anyhow::Result<Arc<dyn PersistenceClient>> {
    match config.backend.kind {
        BackendKind::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on restart");
            Ok(Arc::new(InMemoryBackend::new()))
        }
        #[cfg(feature = "mongodb")]
        BackendKind::Mongodb => {
            let uri = config
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is required"))?;
            tracing::info!("Connecting to MongoDB");
            let client =
                nova_persist::MongoPersistenceClient::connect(uri, &config.backend.database).await?;
            tracing::info!("MongoDB connected");
            Ok(Arc::new(client))
        }
        #[cfg(not(feature = "mongodb"))]
        BackendKind::Mongodb => {
            anyhow::bail!("nova-api was built without the `mongodb` feature")
        }
    }
}

fn build_assistant(config: &Config) -> anyhow::Result<Option<CoachAssistant>> {
    let Some(api_key) = config.llm_gateway_api_key.clone() else {
        tracing::warn!("LLM_GATEWAY_API_KEY not set, assistant endpoint disabled");
        return Ok(None);
    };

    let mut gateway = GatewayConfig::new(api_key);
    if let Some(base_url) = &config.llm.base_url {
        gateway = gateway.with_base_url(base_url.clone());
    }
    let client = ClientFactory::create_chat_client(gateway)?;

    let assistant_config = AssistantConfig {
        llm: config.llm.clone().into(),
        system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        history_limit: config.llm.history_limit,
    };
    tracing::info!(model = %assistant_config.llm.model, "Assistant enabled");
    Ok(Some(CoachAssistant::with_config(client, assistant_config)))
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
