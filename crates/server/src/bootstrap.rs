use leadgate_agent::{AgentRuntime, ToolRegistry};
use leadgate_core::config::{AppConfig, ConfigError, LoadOptions};
use leadgate_core::domain::client::ClientId;
use leadgate_crm::{ClientRegistry, RegistryOptions, UpstreamError, UpstreamFactory};
use thiserror::Error;
use tracing::{info, warn};

use crate::state::{AppState, EnvPresence};

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("upstream client setup failed: {0}")]
    Upstream(#[source] UpstreamError),
    #[error("intent patterns failed to compile: {0}")]
    Patterns(#[source] regex::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        configured_clients = config.clients.len(),
        "starting application bootstrap"
    );

    let factory = UpstreamFactory::from_config(&config).map_err(BootstrapError::Upstream)?;
    let registry = build_registry(&config, factory).await;
    let registered = registry.len().await;
    if registered == 0 {
        warn!(
            event_name = "system.bootstrap.no_clients",
            correlation_id = "bootstrap",
            "no client has a usable credential; requests will fail until one is added"
        );
    }

    let runtime = AgentRuntime::new().map_err(BootstrapError::Patterns)?;
    let tools = ToolRegistry::with_crm_tools();
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        registered_clients = registered,
        tools = tools.len(),
        "application bootstrap complete"
    );

    let state = AppState::new(config.clone(), registry, runtime, tools, EnvPresence::from_env());
    Ok(Application { config, state })
}

pub async fn build_registry(config: &AppConfig, factory: UpstreamFactory) -> ClientRegistry {
    let options = RegistryOptions {
        default_client: config.default_client.as_deref().map(ClientId::from),
        session_ttl: config.session_ttl(),
    };
    ClientRegistry::with_clients(factory, options, config.client_configs()).await
}
