use std::sync::Arc;
use std::time::Duration;

use leadgate_agent::{AgentRuntime, ToolRegistry};
use leadgate_core::config::{AppConfig, ENV_API_KEY, ENV_LOCATION_ID};
use leadgate_crm::ClientRegistry;
use serde::Serialize;

/// Presence of the environment variables the default client is built from.
/// Values are never captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnvPresence {
    #[serde(rename = "GHL_API_KEY")]
    pub api_key: bool,
    #[serde(rename = "GHL_LOCATION_ID")]
    pub location_id: bool,
}

impl EnvPresence {
    pub fn from_env() -> Self {
        let present =
            |key: &str| std::env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false);
        Self { api_key: present(ENV_API_KEY), location_id: present(ENV_LOCATION_ID) }
    }
}

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ClientRegistry>,
    pub runtime: Arc<AgentRuntime>,
    pub tools: Arc<ToolRegistry>,
    pub env: EnvPresence,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        registry: ClientRegistry,
        runtime: AgentRuntime,
        tools: ToolRegistry,
        env: EnvPresence,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            runtime: Arc::new(runtime),
            tools: Arc::new(tools),
            env,
        }
    }

    pub fn sse_keepalive(&self) -> Duration {
        Duration::from_secs(self.config.server.sse_keepalive_secs.max(1))
    }
}
