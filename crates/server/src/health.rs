use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::{AppState, EnvPresence};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientsCheck {
    pub count: usize,
    pub ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub clients: ClientsCheck,
    pub environment: EnvPresence,
    pub checked_at: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Degraded while no tenant is registered: every routed request would fail.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let ids = state.registry.client_ids().await;
    let ready = !ids.is_empty();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: "leadgate-server",
        clients: ClientsCheck { count: ids.len(), ids },
        environment: state.env,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
