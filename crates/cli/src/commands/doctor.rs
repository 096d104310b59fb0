use std::env;

use leadgate_core::config::{AppConfig, LoadOptions, ENV_API_KEY, ENV_LOCATION_ID};
use serde::Serialize;

use super::{escape_json, CommandResult, EXIT_CHECKS_FAILED};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct DoctorCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub overall_status: CheckStatus,
    pub summary: String,
    pub checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()).map_err(|error| error.to_string()));
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_CHECKS_FAILED };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::text(exit_code, output);
    }

    CommandResult::text(exit_code, render_human(&report))
}

pub fn build_report(loaded: Result<AppConfig, String>) -> DoctorReport {
    let mut checks = Vec::new();

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_registered_clients(&config));
            checks.push(check_environment(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["registered_clients", "environment"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// At least one tenant must have a resolvable credential or every routed
/// request fails.
fn check_registered_clients(config: &AppConfig) -> DoctorCheck {
    let (ready, missing): (Vec<_>, Vec<_>) =
        config.clients.iter().partition(|client| client.resolve_credential().is_some());
    let ready_ids = ready.iter().map(|client| client.id.as_str()).collect::<Vec<_>>();
    let missing_ids = missing.iter().map(|client| client.id.as_str()).collect::<Vec<_>>();

    if ready_ids.is_empty() {
        return DoctorCheck {
            name: "registered_clients",
            status: CheckStatus::Fail,
            details: format!(
                "no client has a usable credential; set {ENV_API_KEY} and {ENV_LOCATION_ID} or configure [[clients]]"
            ),
        };
    }

    let mut details = format!("{} client(s) ready: {}", ready_ids.len(), ready_ids.join(", "));
    if !missing_ids.is_empty() {
        details.push_str(&format!("; skipped without credential: {}", missing_ids.join(", ")));
    }
    DoctorCheck { name: "registered_clients", status: CheckStatus::Pass, details }
}

/// A half-configured default client (only one of the two variables set) is
/// almost always a deployment mistake.
fn check_environment(config: &AppConfig) -> DoctorCheck {
    let api_key = env_present(ENV_API_KEY);
    let location_id = env_present(ENV_LOCATION_ID);
    let presence = format!("{ENV_API_KEY}={api_key} {ENV_LOCATION_ID}={location_id}");

    let status = match (api_key, location_id) {
        (true, true) => CheckStatus::Pass,
        (false, false) if !config.clients.is_empty() => CheckStatus::Pass,
        _ => CheckStatus::Fail,
    };
    DoctorCheck { name: "environment", status, details: presence }
}

fn env_present(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
