use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use leadgate_core::config::{AppConfig, UpstreamConfig};
use leadgate_core::domain::client::{ClientConfig, ClientId};
use leadgate_core::retry::RetryPolicy;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::UpstreamError;
use crate::resources::{
    Associations, Businesses, Contacts, Conversations, CustomObjects, Organizations, Tasks,
};
use crate::retry::{RawResponse, RetryExecutor, Sleeper, TokioSleeper};

pub const VERSION_HEADER: &str = "Version";

const VERSIONED_PREFIXES: [&str; 4] = ["/contacts", "/businesses", "/associations", "/objects"];

#[derive(Clone, Debug)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl From<&UpstreamConfig> for UpstreamSettings {
    fn from(config: &UpstreamConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// One outbound call: method, path, query and optional JSON body.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    versioned: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let versioned = VERSIONED_PREFIXES.iter().any(|prefix| path.starts_with(prefix));
        Self { method, path, segments: Vec::new(), query: Vec::new(), body: None, versioned }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a percent-encoded path segment.
    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    pub fn is_versioned(&self) -> bool {
        self.versioned
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self, base_url: &str) -> Result<Url, UpstreamError> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let mut url =
            Url::parse(&raw).map_err(|error| UpstreamError::InvalidUrl(format!("{raw}: {error}")))?;
        if !self.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| UpstreamError::InvalidUrl(raw.clone()))?
                .pop_if_empty()
                .extend(&self.segments);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for _ in &self.segments {
            f.write_str("/{..}")?;
        }
        Ok(())
    }
}

/// Authenticated client bound to one tenant's credential and location.
#[derive(Clone)]
pub struct UpstreamClient {
    client_id: ClientId,
    location_id: String,
    credential: SecretString,
    http: reqwest::Client,
    settings: Arc<UpstreamSettings>,
    executor: RetryExecutor,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("client_id", &self.client_id)
            .field("location_id", &self.location_id)
            .field("base_url", &self.settings.base_url)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    /// Single attempt, no retry, no normalization.
    pub async fn send(&self, request: &ApiRequest) -> Result<RawResponse, UpstreamError> {
        let url = request.url(&self.settings.base_url)?;
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .bearer_auth(self.credential.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if request.versioned {
            builder = builder.header(VERSION_HEADER, self.settings.api_version.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response =
            builder.send().await.map_err(|error| UpstreamError::Transport(error.to_string()))?;
        let status = response.status().as_u16();
        let text =
            response.text().await.map_err(|error| UpstreamError::Transport(error.to_string()))?;

        debug!(
            event_name = "upstream.request.completed",
            client_id = %self.client_id,
            request = %request,
            status,
            "upstream call completed"
        );
        Ok(RawResponse { status, text })
    }

    /// Single attempt that never fails: transport errors and non-JSON
    /// bodies come back as error-shaped envelopes.
    pub async fn request(&self, request: &ApiRequest) -> Envelope {
        match self.send(request).await {
            Ok(response) => Envelope::from_response(response.status, &response.text),
            Err(error) => Envelope::transport_error(error.to_string()),
        }
    }

    /// Retried call. Terminal statuses and exhausted retries are errors;
    /// any 2xx is normalized into an envelope.
    pub async fn execute(&self, request: &ApiRequest) -> Result<Envelope, UpstreamError> {
        let operation = request.to_string();
        let response = self.executor.run(&operation, move || self.send(request)).await?;
        Ok(Envelope::from_response(response.status, &response.text))
    }

    pub fn contacts(&self) -> Contacts<'_> {
        Contacts::new(self)
    }

    pub fn businesses(&self) -> Businesses<'_> {
        Businesses::new(self)
    }

    pub fn associations(&self) -> Associations<'_> {
        Associations::new(self)
    }

    pub fn objects(&self) -> CustomObjects<'_> {
        CustomObjects::new(self)
    }

    pub fn tasks(&self) -> Tasks<'_> {
        Tasks::new(self)
    }

    pub fn organizations(&self) -> Organizations<'_> {
        Organizations::new(self)
    }

    pub fn conversations(&self) -> Conversations<'_> {
        Conversations::new(self)
    }
}

/// Builds per-tenant clients that share one connection pool and retry
/// policy.
#[derive(Clone)]
pub struct UpstreamFactory {
    http: reqwest::Client,
    settings: Arc<UpstreamSettings>,
    executor: RetryExecutor,
}

impl fmt::Debug for UpstreamFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamFactory")
            .field("settings", &self.settings)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl UpstreamFactory {
    pub fn new(
        settings: UpstreamSettings,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| UpstreamError::Transport(error.to_string()))?;
        Ok(Self { http, settings: Arc::new(settings), executor: RetryExecutor::new(retry, sleeper) })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        Self::new(
            UpstreamSettings::from(&config.upstream),
            config.retry.clone(),
            Arc::new(TokioSleeper),
        )
    }

    pub fn settings(&self) -> &UpstreamSettings {
        &self.settings
    }

    /// `None` when the tenant has no usable credential.
    pub fn build(&self, config: &ClientConfig) -> Option<UpstreamClient> {
        if !config.has_credential() {
            return None;
        }
        let credential = config.credential.clone()?;
        Some(UpstreamClient {
            client_id: config.id.clone(),
            location_id: config.location_id.clone(),
            credential,
            http: self.http.clone(),
            settings: Arc::clone(&self.settings),
            executor: self.executor.clone(),
        })
    }
}
