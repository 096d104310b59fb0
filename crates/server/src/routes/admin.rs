use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use leadgate_core::domain::client::{ClientConfig, ClientSummary, SessionMapping};
use leadgate_crm::AddOutcome;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::routes::{route_error, RouteError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(add_client))
        .route("/clients/{client_id}", get(get_client).delete(remove_client))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{session_key}", get(get_session).delete(remove_session))
}

#[derive(Debug, Serialize)]
pub struct ClientList {
    pub clients: Vec<ClientSummary>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionMapping>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct Removed {
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddClientRequest {
    #[serde(alias = "clientId")]
    pub id: String,
    pub location_id: String,
    #[serde(default, alias = "apiKey", alias = "pit")]
    pub credential: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub session_key: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub contact_id: Option<String>,
}

async fn list_clients(State(state): State<AppState>) -> Json<ClientList> {
    let clients = state.registry.list().await;
    Json(ClientList { count: clients.len(), clients })
}

/// 201 for a new tenant, 200 when an existing id is replaced.
async fn add_client(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ClientSummary>), RouteError> {
    let body: AddClientRequest = parse_body(&body)?;
    let id = body.id.trim();
    let location_id = body.location_id.trim();
    if id.is_empty() || location_id.is_empty() {
        return Err(route_error(StatusCode::BAD_REQUEST, "id and locationId are required"));
    }

    let credential = body.credential.filter(|value| !value.trim().is_empty()).map(SecretString::from);
    let mut config = ClientConfig::new(id, credential, location_id);
    config.display_name = body.display_name;
    let summary = config.summary();

    match state.registry.add(config).await {
        AddOutcome::Registered => Ok((StatusCode::CREATED, Json(summary))),
        AddOutcome::Replaced => Ok((StatusCode::OK, Json(summary))),
        AddOutcome::SkippedMissingCredential => Err(route_error(
            StatusCode::BAD_REQUEST,
            format!("client `{id}` has no credential and was not registered"),
        )),
    }
}

async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<ClientSummary>, RouteError> {
    state
        .registry
        .get(&client_id)
        .await
        .map(|client| Json(client.config.summary()))
        .ok_or_else(|| unknown_client(&client_id))
}

async fn remove_client(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Removed>, RouteError> {
    if state.registry.remove(&client_id).await {
        Ok(Json(Removed { removed: true }))
    } else {
        Err(unknown_client(&client_id))
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionList> {
    let sessions = state.registry.sessions().await;
    Json(SessionList { count: sessions.len(), sessions })
}

async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionMapping>), RouteError> {
    let body: CreateSessionRequest = parse_body(&body)?;
    let session_key = body
        .session_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mapping = state
        .registry
        .create_session(&session_key, body.client_id.trim(), body.contact_id)
        .await
        .map_err(|error| route_error(StatusCode::BAD_REQUEST, error.to_string()))?;

    info!(
        event_name = "admin.session.created",
        session_key = %mapping.session_key,
        client_id = %mapping.client_id,
        "session created"
    );
    Ok((StatusCode::CREATED, Json(mapping)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> Result<Json<SessionMapping>, RouteError> {
    state
        .registry
        .session(&session_key)
        .await
        .map(Json)
        .ok_or_else(|| unknown_session(&session_key))
}

async fn remove_session(
    State(state): State<AppState>,
    Path(session_key): Path<String>,
) -> Result<Json<Removed>, RouteError> {
    if state.registry.remove_session(&session_key).await {
        Ok(Json(Removed { removed: true }))
    } else {
        Err(unknown_session(&session_key))
    }
}

/// Content type is not enforced; any body that parses is accepted.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RouteError> {
    serde_json::from_slice(body)
        .map_err(|error| route_error(StatusCode::BAD_REQUEST, format!("invalid JSON body: {error}")))
}

fn unknown_client(client_id: &str) -> RouteError {
    route_error(StatusCode::NOT_FOUND, format!("client `{client_id}` not found"))
}

fn unknown_session(session_key: &str) -> RouteError {
    route_error(StatusCode::NOT_FOUND, format!("session `{session_key}` not found"))
}
