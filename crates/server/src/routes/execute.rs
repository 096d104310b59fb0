use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use leadgate_agent::{ExecuteOutcome, ExecuteRequest};
use leadgate_core::errors::{ApplicationError, FieldError};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::routes::{correlation_id, with_correlation};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/execute-agent", post(execute_agent))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSuccess {
    pub success: bool,
    pub data: Value,
    pub action: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    pub timestamp: String,
    pub response_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_clients: Option<Vec<String>>,
}

pub async fn execute_agent(State(state): State<AppState>, body: Bytes) -> Response {
    let correlation_id = correlation_id();
    let started = Instant::now();

    let response = match run(&state, &body).await {
        Ok((client_id, outcome)) => {
            let elapsed = started.elapsed().as_millis();
            info!(
                event_name = "gateway.execute.completed",
                correlation_id = %correlation_id,
                client_id = %client_id,
                action = %outcome.action,
                elapsed_ms = elapsed as u64,
                "agent request completed"
            );
            let ExecuteOutcome { action, data, contact_id } = outcome;
            (
                StatusCode::OK,
                Json(ExecuteSuccess {
                    success: true,
                    data,
                    action,
                    client_id,
                    contact_id,
                    timestamp: Utc::now().to_rfc3339(),
                    response_time: format!("{elapsed}ms"),
                }),
            )
                .into_response()
        }
        Err(error) => {
            warn!(
                event_name = "gateway.execute.failed",
                correlation_id = %correlation_id,
                error = %error,
                "agent request failed"
            );
            failure(error, &correlation_id).into_response()
        }
    };

    with_correlation(&correlation_id, response)
}

async fn run(state: &AppState, body: &[u8]) -> Result<(String, ExecuteOutcome), ApplicationError> {
    let request = parse(body)?;
    // Validation happens before any tenant lookup or upstream call.
    let plan = state.runtime.plan(&request)?;
    let resolved = state.registry.resolve(&request.routing_hints()).await?;
    let outcome = state.runtime.execute(&resolved, plan).await?;
    Ok((resolved.client_id.to_string(), outcome))
}

fn parse(body: &[u8]) -> Result<ExecuteRequest, ApplicationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExecuteRequest::default());
    }
    serde_json::from_slice(body).map_err(|error| {
        ApplicationError::validation(vec![FieldError::new("body", format!("invalid JSON body: {error}"))])
    })
}

fn failure(error: ApplicationError, correlation_id: &str) -> (StatusCode, Json<ExecuteFailure>) {
    let (details, available_clients) = match &error {
        ApplicationError::Validation { fields, .. } => (Some(fields.clone()), None),
        ApplicationError::ClientResolution { available_clients, .. } => {
            (None, Some(available_clients.clone()))
        }
        _ => (None, None),
    };
    let interface = error.into_interface(correlation_id);
    let status = StatusCode::from_u16(interface.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ExecuteFailure {
            success: false,
            error: interface.message().to_string(),
            details,
            available_clients,
        }),
    )
}
