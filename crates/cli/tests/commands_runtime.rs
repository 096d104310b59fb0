use std::env;
use std::sync::{Mutex, OnceLock};

use leadgate_cli::commands::{clients, config, doctor, EXIT_CHECKS_FAILED, EXIT_CONFIG_INVALID};
use serde_json::Value;

#[test]
fn doctor_passes_with_env_client() {
    with_env(&[("GHL_API_KEY", "pit-test"), ("GHL_LOCATION_ID", "loc-env")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "expected passing doctor report");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"][1]["name"], "registered_clients");
        assert!(payload["checks"][1]["details"].as_str().unwrap_or_default().contains("default"));
        assert!(!result.output.contains("pit-test"));
    });
}

#[test]
fn doctor_fails_without_any_client() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, EXIT_CHECKS_FAILED);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "pass");
        assert_eq!(payload["checks"][1]["status"], "fail");
    });
}

#[test]
fn doctor_flags_half_configured_environment() {
    with_env(&[("GHL_API_KEY", "pit-test")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, EXIT_CHECKS_FAILED);
        assert!(result.output.contains("- [fail] environment: GHL_API_KEY=true GHL_LOCATION_ID=false"));
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("LEADGATE_SERVER_PORT", "not-a-port")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, EXIT_CHECKS_FAILED);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
        assert_eq!(payload["checks"][2]["status"], "skipped");
    });
}

#[test]
fn config_reports_env_sources_and_redacts_credentials() {
    with_env(
        &[
            ("GHL_API_KEY", "pit-supersecret"),
            ("GHL_LOCATION_ID", "loc-env"),
            ("LEADGATE_SERVER_PORT", "8088"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0);
            assert!(result.output.contains("- server.port = 8088 (source: env (LEADGATE_SERVER_PORT))"));
            assert!(result.output.contains("- clients.default = location_id=loc-env credential=pit-***"));
            assert!(!result.output.contains("supersecret"));
        },
    );
}

#[test]
fn config_returns_structured_failure_on_invalid_override() {
    with_env(&[("LEADGATE_LOGGING_FORMAT", "xml")], || {
        let result = config::run();
        assert_eq!(result.exit_code, EXIT_CONFIG_INVALID);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn clients_lists_env_client() {
    with_env(&[("GHL_API_KEY", "pit-test"), ("GHL_LOCATION_ID", "loc-env")], || {
        let result = clients::run();
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("- default location=loc-env (registers)"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "GHL_API_KEY",
        "GHL_LOCATION_ID",
        "PORT",
        "LEADGATE_SERVER_BIND_ADDRESS",
        "LEADGATE_SERVER_PORT",
        "LEADGATE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "LEADGATE_SERVER_SSE_KEEPALIVE_SECS",
        "LEADGATE_UPSTREAM_BASE_URL",
        "LEADGATE_UPSTREAM_API_VERSION",
        "LEADGATE_UPSTREAM_TIMEOUT_SECS",
        "LEADGATE_RETRY_ENABLED",
        "LEADGATE_RETRY_MAX_RETRIES",
        "LEADGATE_RETRY_BASE_DELAY_MS",
        "LEADGATE_RETRY_MAX_DELAY_MS",
        "LEADGATE_SESSIONS_TTL_SECS",
        "LEADGATE_DEFAULT_CLIENT",
        "LEADGATE_LOGGING_LEVEL",
        "LEADGATE_LOGGING_FORMAT",
        "LEADGATE_LOG_LEVEL",
        "LEADGATE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
