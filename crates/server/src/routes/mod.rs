//! HTTP surface of the gateway.

pub mod admin;
pub mod execute;
pub mod mcp;

use axum::http::{HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::health;
use crate::state::AppState;

pub const CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(execute::router())
        .merge(mcp::router())
        .merge(admin::router())
        .merge(health::router())
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type RouteError = (StatusCode, Json<ErrorBody>);

pub fn route_error(status: StatusCode, message: impl Into<String>) -> RouteError {
    (status, Json(ErrorBody { error: message.into() }))
}

pub fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Attaches the correlation id header to any response.
pub fn with_correlation(correlation_id: &str, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn not_found(uri: Uri) -> RouteError {
    route_error(StatusCode::NOT_FOUND, format!("no route for `{}`", uri.path()))
}
