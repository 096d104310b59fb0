//! Tool-invocation envelope and the SSE keep-alive channel.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use leadgate_agent::ToolDescriptor;
use leadgate_crm::{RegistryError, ResolvedClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{interval_at, Instant};
use tokio_stream::wrappers::IntervalStream;
use tracing::{info, warn};

use crate::routes::{correlation_id, with_correlation};
use crate::state::AppState;

pub const CONNECTION_MESSAGE: &str = "MCP SSE connection established";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mcp", post(mcp_root))
        .route("/mcp/{session_id}", post(mcp_session).get(sse))
        .route("/mcp/{session_id}/sse", get(sse))
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub arguments: Option<Value>,
    #[serde(default)]
    pub client_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolList {
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub content: Vec<TextContent>,
}

#[derive(Debug, Serialize)]
pub struct McpErrorBody {
    pub error: TextContent,
}

async fn mcp_root(State(state): State<AppState>, body: Bytes) -> Response {
    handle(state, None, &body).await
}

async fn mcp_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Response {
    handle(state, Some(session_id), &body).await
}

async fn handle(state: AppState, session_key: Option<String>, body: &[u8]) -> Response {
    let correlation_id = correlation_id();
    let response = match dispatch(&state, session_key.as_deref(), body).await {
        Ok(response) => response,
        Err(message) => {
            warn!(
                event_name = "mcp.request.failed",
                correlation_id = %correlation_id,
                error = %message,
                "mcp request failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(McpErrorBody { error: TextContent { kind: "error", text: message } }),
            )
                .into_response()
        }
    };
    with_correlation(&correlation_id, response)
}

async fn dispatch(
    state: &AppState,
    session_key: Option<&str>,
    body: &[u8],
) -> Result<Response, String> {
    let request: McpRequest =
        serde_json::from_slice(body).map_err(|error| format!("Invalid MCP request: {error}"))?;

    match request.kind.as_str() {
        "tools/list" => Ok(Json(ToolList { tools: state.tools.descriptors() }).into_response()),
        "ping" => Ok(Json(json!({ "pong": true })).into_response()),
        "tools/call" => {
            let tool = request
                .tool
                .as_deref()
                .map(str::trim)
                .filter(|tool| !tool.is_empty())
                .ok_or_else(|| "Tool name is required".to_string())?;
            let resolved = resolve(state, request.client_id.as_deref(), session_key)
                .await
                .map_err(|error| error.to_string())?;
            let arguments = request.arguments.unwrap_or_else(|| json!({}));

            info!(
                event_name = "mcp.tool.called",
                client_id = %resolved.client_id,
                resolved_by = %resolved.source,
                tool = %tool,
                "mcp tool invoked"
            );
            let output = state
                .tools
                .call(tool, &resolved.upstream, arguments)
                .await
                .map_err(|error| format!("{error:#}"))?;
            let text = serde_json::to_string_pretty(&output).map_err(|error| error.to_string())?;

            Ok(Json(ToolResult { content: vec![TextContent { kind: "text", text }] }).into_response())
        }
        other => Err(format!("Unknown MCP request type: {other}")),
    }
}

/// Body `clientId` must resolve when given. Otherwise the path session key
/// is tried before the default client.
async fn resolve(
    state: &AppState,
    client_id: Option<&str>,
    session_key: Option<&str>,
) -> Result<ResolvedClient, RegistryError> {
    let registry = &state.registry;
    if let Some(client_id) = client_id.map(str::trim).filter(|id| !id.is_empty()) {
        return registry.resolve_by_client_id(client_id).await;
    }
    if let Some(session_key) = session_key {
        if let Ok(resolved) = registry.resolve_by_session(session_key).await {
            return Ok(resolved);
        }
    }
    registry.resolve_default().await
}

/// Logs once when the client goes away and the stream is dropped.
struct SseGuard {
    session_id: String,
}

impl Drop for SseGuard {
    fn drop(&mut self) {
        info!(
            event_name = "mcp.sse.closed",
            session_id = %self.session_id,
            "sse connection closed"
        );
    }
}

pub async fn sse(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(event_name = "mcp.sse.opened", session_id = %session_id, "sse connection opened");

    let period = state.sse_keepalive();
    let connected = json!({ "type": "connection", "message": CONNECTION_MESSAGE });
    let pings = IntervalStream::new(interval_at(Instant::now() + period, period))
        .map(|_| json!({ "type": "ping" }));

    let guard = SseGuard { session_id };
    let stream = stream::once(async move { connected }).chain(pings).map(move |message| {
        let _ = &guard;
        Ok(Event::default().data(message.to_string()))
    });

    Sse::new(stream)
}
