use leadgate_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::{CommandResult, EXIT_CONFIG_INVALID};

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ClientLine {
    pub id: String,
    pub location_id: String,
    pub display_name: Option<String>,
    pub registers: bool,
    pub is_default: bool,
}

pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => CommandResult::text(0, render(&lines(&config))),
        Err(error) => CommandResult::failure(
            "clients",
            "config_validation",
            format!("config validation failed: {error}"),
            EXIT_CONFIG_INVALID,
        ),
    }
}

/// Clients in startup registration order. Credentials never leave this
/// function; only whether one resolves.
pub fn lines(config: &AppConfig) -> Vec<ClientLine> {
    config
        .clients
        .iter()
        .map(|client| ClientLine {
            id: client.id.clone(),
            location_id: client.location_id.clone(),
            display_name: client.display_name.clone(),
            registers: client.resolve_credential().is_some(),
            is_default: config.default_client.as_deref() == Some(client.id.as_str()),
        })
        .collect()
}

fn render(lines: &[ClientLine]) -> String {
    if lines.is_empty() {
        return "no clients configured".to_string();
    }

    let mut output = vec![format!("{} configured client(s):", lines.len())];
    for line in lines {
        let state = if line.registers { "registers" } else { "skipped: no credential" };
        let default_marker = if line.is_default { " [default]" } else { "" };
        let name = line.display_name.as_deref().map(|name| format!(" \"{name}\"")).unwrap_or_default();
        output.push(format!(
            "- {}{name} location={}{default_marker} ({state})",
            line.id, line.location_id
        ));
    }
    output.join("\n")
}
