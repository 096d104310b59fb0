use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::client::ClientConfig;
use crate::retry::RetryPolicy;

pub const ENV_API_KEY: &str = "GHL_API_KEY";
pub const ENV_LOCATION_ID: &str = "GHL_LOCATION_ID";
pub const ENV_CLIENT_ID: &str = "default";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub retry: RetryPolicy,
    pub sessions: SessionsConfig,
    pub clients: Vec<ClientEntry>,
    pub default_client: Option<String>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub sse_keepalive_secs: u64,
}

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct SessionsConfig {
    pub ttl_secs: Option<u64>,
}

/// A configured tenant. The credential is either inline or read from the
/// named environment variable when clients are materialised.
#[derive(Clone, Debug)]
pub struct ClientEntry {
    pub id: String,
    pub location_id: String,
    pub credential: Option<SecretString>,
    pub credential_env: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub upstream_base_url: Option<String>,
    pub default_client: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
                sse_keepalive_secs: 30,
            },
            upstream: UpstreamConfig {
                base_url: "https://services.leadconnectorhq.com".to_string(),
                api_version: "2021-07-28".to_string(),
                timeout_secs: 30,
            },
            retry: RetryPolicy::default(),
            sessions: SessionsConfig::default(),
            clients: Vec::new(),
            default_client: None,
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ClientEntry {
    pub fn resolve_credential(&self) -> Option<SecretString> {
        if let Some(credential) = &self.credential {
            if !credential.expose_secret().trim().is_empty() {
                return Some(credential.clone());
            }
        }
        self.credential_env.as_deref().and_then(read_env).map(SecretString::from)
    }

    pub fn to_client_config(&self) -> ClientConfig {
        let mut config =
            ClientConfig::new(self.id.as_str(), self.resolve_credential(), self.location_id.as_str());
        config.display_name = self.display_name.clone();
        config
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leadgate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Client configurations in declaration order, credentials resolved.
    pub fn client_configs(&self) -> Vec<ClientConfig> {
        self.clients.iter().map(ClientEntry::to_client_config).collect()
    }

    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        self.sessions
            .ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(sse_keepalive_secs) = server.sse_keepalive_secs {
                self.server.sse_keepalive_secs = sse_keepalive_secs;
            }
        }

        if let Some(upstream) = patch.upstream {
            if let Some(base_url) = upstream.base_url {
                self.upstream.base_url = base_url;
            }
            if let Some(api_version) = upstream.api_version {
                self.upstream.api_version = api_version;
            }
            if let Some(timeout_secs) = upstream.timeout_secs {
                self.upstream.timeout_secs = timeout_secs;
            }
        }

        if let Some(retry) = patch.retry {
            if let Some(enabled) = retry.enabled {
                self.retry.enabled = enabled;
            }
            if let Some(max_retries) = retry.max_retries {
                self.retry.max_retries = max_retries;
            }
            if let Some(base_delay_ms) = retry.base_delay_ms {
                self.retry.base_delay_ms = base_delay_ms;
            }
            if let Some(max_delay_ms) = retry.max_delay_ms {
                self.retry.max_delay_ms = max_delay_ms;
            }
            if let Some(backoff_multiplier) = retry.backoff_multiplier {
                self.retry.backoff_multiplier = backoff_multiplier;
            }
        }

        if let Some(sessions) = patch.sessions {
            self.sessions.ttl_secs = sessions.ttl_secs;
        }

        if let Some(clients) = patch.clients {
            self.clients = clients
                .into_iter()
                .map(|client| ClientEntry {
                    id: client.id,
                    location_id: client.location_id,
                    credential: client.credential.map(SecretString::from),
                    credential_env: client.credential_env,
                    display_name: client.display_name,
                })
                .collect();
        }

        if let Some(default_client) = patch.default_client {
            self.default_client = Some(default_client);
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LEADGATE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }
        if let Some(value) = read_env("LEADGATE_SERVER_PORT") {
            self.server.port = parse_u16("LEADGATE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("LEADGATE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("LEADGATE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("LEADGATE_SERVER_SSE_KEEPALIVE_SECS") {
            self.server.sse_keepalive_secs =
                parse_u64("LEADGATE_SERVER_SSE_KEEPALIVE_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADGATE_UPSTREAM_BASE_URL") {
            self.upstream.base_url = value;
        }
        if let Some(value) = read_env("LEADGATE_UPSTREAM_API_VERSION") {
            self.upstream.api_version = value;
        }
        if let Some(value) = read_env("LEADGATE_UPSTREAM_TIMEOUT_SECS") {
            self.upstream.timeout_secs = parse_u64("LEADGATE_UPSTREAM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("LEADGATE_RETRY_ENABLED") {
            self.retry.enabled = parse_bool("LEADGATE_RETRY_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADGATE_RETRY_MAX_RETRIES") {
            self.retry.max_retries = parse_u32("LEADGATE_RETRY_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("LEADGATE_RETRY_BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_u64("LEADGATE_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("LEADGATE_RETRY_MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_u64("LEADGATE_RETRY_MAX_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("LEADGATE_SESSIONS_TTL_SECS") {
            self.sessions.ttl_secs = Some(parse_u64("LEADGATE_SESSIONS_TTL_SECS", &value)?);
        }

        if let Some(value) = read_env("LEADGATE_DEFAULT_CLIENT") {
            self.default_client = Some(value);
        }

        let api_key = read_env(ENV_API_KEY);
        let location_id = read_env(ENV_LOCATION_ID);
        if let (Some(api_key), Some(location_id)) = (api_key, location_id) {
            let entry = ClientEntry {
                id: ENV_CLIENT_ID.to_string(),
                location_id,
                credential: Some(SecretString::from(api_key)),
                credential_env: None,
                display_name: None,
            };
            match self.clients.iter_mut().find(|client| client.id == ENV_CLIENT_ID) {
                Some(existing) => *existing = entry,
                None => self.clients.push(entry),
            }
        }

        let log_level =
            read_env("LEADGATE_LOGGING_LEVEL").or_else(|| read_env("LEADGATE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("LEADGATE_LOGGING_FORMAT").or_else(|| read_env("LEADGATE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(base_url) = overrides.upstream_base_url {
            self.upstream.base_url = base_url;
        }
        if let Some(default_client) = overrides.default_client {
            self.default_client = Some(default_client);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_upstream(&self.upstream)?;
        validate_retry(&self.retry)?;
        validate_sessions(&self.sessions)?;
        validate_clients(&self.clients, self.default_client.as_deref())?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("leadgate.toml"), PathBuf::from("config/leadgate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if server.sse_keepalive_secs == 0 {
        return Err(ConfigError::Validation(
            "server.sse_keepalive_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_upstream(upstream: &UpstreamConfig) -> Result<(), ConfigError> {
    let base_url = upstream.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "upstream.base_url must start with http:// or https://".to_string(),
        ));
    }

    if upstream.api_version.trim().is_empty() {
        return Err(ConfigError::Validation("upstream.api_version must not be empty".to_string()));
    }

    if upstream.timeout_secs == 0 || upstream.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "upstream.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry(retry: &RetryPolicy) -> Result<(), ConfigError> {
    if retry.max_retries > 10 {
        return Err(ConfigError::Validation("retry.max_retries must be at most 10".to_string()));
    }

    if retry.base_delay_ms == 0 {
        return Err(ConfigError::Validation(
            "retry.base_delay_ms must be greater than zero".to_string(),
        ));
    }

    if retry.max_delay_ms < retry.base_delay_ms {
        return Err(ConfigError::Validation(
            "retry.max_delay_ms must not be lower than retry.base_delay_ms".to_string(),
        ));
    }

    if retry.backoff_multiplier == 0 {
        return Err(ConfigError::Validation(
            "retry.backoff_multiplier must be at least 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_sessions(sessions: &SessionsConfig) -> Result<(), ConfigError> {
    if sessions.ttl_secs == Some(0) {
        return Err(ConfigError::Validation(
            "sessions.ttl_secs must be greater than zero when set".to_string(),
        ));
    }
    Ok(())
}

fn validate_clients(clients: &[ClientEntry], default_client: Option<&str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for client in clients {
        if client.id.trim().is_empty() {
            return Err(ConfigError::Validation("clients[].id must not be empty".to_string()));
        }
        if client.location_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "clients[{}].location_id must not be empty",
                client.id
            )));
        }
        if !seen.insert(client.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "client id `{}` is configured more than once",
                client.id
            )));
        }
    }

    if let Some(default_client) = default_client {
        if !seen.contains(default_client) {
            return Err(ConfigError::Validation(format!(
                "default_client `{default_client}` does not match any configured client"
            )));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    upstream: Option<UpstreamPatch>,
    retry: Option<RetryPatch>,
    sessions: Option<SessionsPatch>,
    clients: Option<Vec<ClientPatch>>,
    default_client: Option<String>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    sse_keepalive_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct UpstreamPatch {
    base_url: Option<String>,
    api_version: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetryPatch {
    enabled: Option<bool>,
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    backoff_multiplier: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionsPatch {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ClientPatch {
    id: String,
    location_id: String,
    credential: Option<String>,
    credential_env: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
