use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leadgate_core::config::{AppConfig, LoadOptions, ENV_API_KEY, ENV_CLIENT_ID, ENV_LOCATION_ID};
use secrecy::ExposeSecret;
use toml::Value;

use super::{redact_credential, CommandResult, EXIT_CONFIG_INVALID};

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => CommandResult::text(0, render(&config)),
        Err(error) => CommandResult::failure(
            "config",
            "config_validation",
            format!("config validation failed: {error}"),
            EXIT_CONFIG_INVALID,
        ),
    }
}

/// One `- key = value (source: ...)` line per effective setting.
pub fn render(config: &AppConfig) -> String {
    let sources = Sources::detect();
    let mut lines =
        vec!["effective config (source precedence: override > env > file > default):".to_string()];

    let optional = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());
    let settings = vec![
        Setting::new("server.bind_address", &config.server.bind_address, &["LEADGATE_SERVER_BIND_ADDRESS"]),
        Setting::new("server.port", config.server.port, &["LEADGATE_SERVER_PORT", "PORT"]),
        Setting::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs,
            &["LEADGATE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Setting::new(
            "server.sse_keepalive_secs",
            config.server.sse_keepalive_secs,
            &["LEADGATE_SERVER_SSE_KEEPALIVE_SECS"],
        ),
        Setting::new("upstream.base_url", &config.upstream.base_url, &["LEADGATE_UPSTREAM_BASE_URL"]),
        Setting::new("upstream.api_version", &config.upstream.api_version, &["LEADGATE_UPSTREAM_API_VERSION"]),
        Setting::new("upstream.timeout_secs", config.upstream.timeout_secs, &["LEADGATE_UPSTREAM_TIMEOUT_SECS"]),
        Setting::new("retry.enabled", config.retry.enabled, &["LEADGATE_RETRY_ENABLED"]),
        Setting::new("retry.max_retries", config.retry.max_retries, &["LEADGATE_RETRY_MAX_RETRIES"]),
        Setting::new("retry.base_delay_ms", config.retry.base_delay_ms, &["LEADGATE_RETRY_BASE_DELAY_MS"]),
        Setting::new("retry.max_delay_ms", config.retry.max_delay_ms, &["LEADGATE_RETRY_MAX_DELAY_MS"]),
        Setting::new(
            "sessions.ttl_secs",
            optional(config.sessions.ttl_secs.map(|secs| secs.to_string())),
            &["LEADGATE_SESSIONS_TTL_SECS"],
        ),
        Setting::new("default_client", optional(config.default_client.clone()), &["LEADGATE_DEFAULT_CLIENT"]),
        Setting::new("logging.level", &config.logging.level, &["LEADGATE_LOGGING_LEVEL", "LEADGATE_LOG_LEVEL"]),
        Setting::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["LEADGATE_LOGGING_FORMAT", "LEADGATE_LOG_FORMAT"],
        ),
    ];

    for setting in settings {
        lines.push(render_line(setting.key, &setting.value, sources.field(setting.key, setting.env_keys)));
    }

    for client in &config.clients {
        let credential = match client.resolve_credential() {
            Some(secret) => redact_credential(secret.expose_secret()),
            None => "<unset>".to_string(),
        };
        let source = if client.id == ENV_CLIENT_ID && env_present(&[ENV_API_KEY, ENV_LOCATION_ID]) {
            format!("env ({ENV_API_KEY}, {ENV_LOCATION_ID})")
        } else if let Some(var) = &client.credential_env {
            format!("env ({var})")
        } else if sources.file_has("clients") {
            sources.file_label()
        } else {
            "default".to_string()
        };
        lines.push(render_line(
            &format!("clients.{}", client.id),
            &format!("location_id={} credential={credential}", client.location_id),
            source,
        ));
    }

    lines.join("\n")
}

struct Setting {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Setting {
    fn new(key: &'static str, value: impl ToString, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.to_string(), env_keys }
    }
}

struct Sources {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl Sources {
    fn detect() -> Self {
        let path = detect_config_path();
        let doc = load_config_file_doc(path.as_deref());
        Self { path, doc }
    }

    fn field(&self, key_path: &str, env_keys: &[&str]) -> String {
        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }
        if self.file_has(key_path) {
            return self.file_label();
        }
        "default".to_string()
    }

    fn file_has(&self, key_path: &str) -> bool {
        self.doc.as_ref().is_some_and(|doc| contains_path(doc, key_path))
    }

    fn file_label(&self) -> String {
        let file_path = self
            .path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        format!("file ({file_path})")
    }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("leadgate.toml"), PathBuf::from("config/leadgate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn env_present(keys: &[&str]) -> bool {
    keys.iter().all(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()))
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
