//! In-process stand-in for the upstream CRM API.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use leadgate_core::domain::client::ClientConfig;
use leadgate_core::retry::RetryPolicy;
use leadgate_crm::{RecordingSleeper, UpstreamClient, UpstreamFactory, UpstreamSettings};
use secrecy::SecretString;
use serde_json::{json, Value};

#[derive(Clone, Debug)]
pub enum Reply {
    Json(u16, Value),
    Raw(u16, String),
    /// Responds with the request body merged over `fields`.
    Echo(u16, Value),
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub version: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone, Default)]
struct StubState {
    routes: Arc<Mutex<HashMap<(String, String), VecDeque<Reply>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct StubUpstream {
    pub base_url: String,
    state: StubState,
}

impl StubUpstream {
    pub async fn start() -> Self {
        let state = StubState::default();
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener =
            tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("stub listener should bind");
        let address = listener.local_addr().expect("stub listener should have an address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { base_url: format!("http://{address}"), state }
    }

    /// Queues replies for `method path`; the last reply repeats.
    pub fn on(&self, method: &str, path: &str, replies: Vec<Reply>) {
        self.state
            .routes
            .lock()
            .expect("routes lock")
            .insert((method.to_string(), path.to_string()), replies.into());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
    };
    let body_json = serde_json::from_slice::<Value>(&body).ok();
    let path = uri.path().to_string();

    state.requests.lock().expect("requests lock").push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: header("authorization"),
        version: header("version"),
        body: body_json.clone(),
    });

    let reply = {
        let mut routes = state.routes.lock().expect("routes lock");
        match routes.get_mut(&(method.to_string(), path)) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        }
    };

    match reply {
        Some(Reply::Json(status, value)) => (status_code(status), value.to_string()).into_response(),
        Some(Reply::Raw(status, text)) => (status_code(status), text).into_response(),
        Some(Reply::Echo(status, fields)) => {
            let mut merged = fields.as_object().cloned().unwrap_or_default();
            if let Some(Value::Object(request_body)) = body_json {
                for (key, value) in request_body {
                    merged.insert(key, value);
                }
            }
            (status_code(status), Value::Object(merged).to_string()).into_response()
        }
        None => (StatusCode::NOT_FOUND, json!({"message": "no stub route"}).to_string())
            .into_response(),
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).expect("stub status should be valid")
}

pub fn factory(base_url: &str) -> (UpstreamFactory, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let factory = UpstreamFactory::new(
        UpstreamSettings {
            base_url: base_url.to_string(),
            api_version: "2021-07-28".to_string(),
            timeout: Duration::from_secs(5),
        },
        RetryPolicy::default(),
        Arc::new(sleeper.clone()),
    )
    .expect("factory should build");
    (factory, sleeper)
}

pub fn tenant(id: &str, location_id: &str) -> ClientConfig {
    ClientConfig::new(id, Some(SecretString::from(format!("pit-{id}"))), location_id)
}

pub fn client(stub: &StubUpstream, id: &str, location_id: &str) -> (UpstreamClient, RecordingSleeper) {
    let (factory, sleeper) = factory(&stub.base_url);
    let client = factory.build(&tenant(id, location_id)).expect("tenant has a credential");
    (client, sleeper)
}
