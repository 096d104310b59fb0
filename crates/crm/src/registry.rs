//! Tenant routing: which credential and location serve a request.
//!
//! Resolution precedence is explicit client id, then session key, then
//! contact identifier. The default client only answers requests that carry
//! no routing hint at all.

use std::collections::HashMap;
use std::fmt;

use chrono::{Duration, Utc};
use leadgate_core::domain::client::{ClientConfig, ClientId, ClientSummary, SessionMapping};
use leadgate_core::errors::ApplicationError;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::{ApiRequest, UpstreamClient, UpstreamFactory};
use crate::envelope::Envelope;

pub const NO_CLIENT_MESSAGE: &str = "No valid client found";

#[derive(Clone, Debug)]
pub struct RegisteredClient {
    pub config: ClientConfig,
    pub upstream: UpstreamClient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    ClientId,
    Session,
    Contact,
    Default,
}

impl ResolutionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::Session => "session",
            Self::Contact => "contact",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedClient {
    pub client_id: ClientId,
    pub config: ClientConfig,
    pub upstream: UpstreamClient,
    /// Contact id learned while resolving (session mapping or contact scan).
    pub contact_id: Option<String>,
    pub source: ResolutionSource,
}

impl ResolvedClient {
    fn from_registered(
        client: RegisteredClient,
        source: ResolutionSource,
        contact_id: Option<String>,
    ) -> Self {
        Self {
            client_id: client.config.id.clone(),
            config: client.config,
            upstream: client.upstream,
            contact_id,
            source,
        }
    }
}

/// Routing keys a caller may supply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingHints {
    pub client_id: Option<String>,
    pub session_key: Option<String>,
    pub contact_identifier: Option<String>,
}

impl RoutingHints {
    fn normalized(&self) -> Self {
        let clean = |value: &Option<String>| {
            value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
        };
        Self {
            client_id: clean(&self.client_id),
            session_key: clean(&self.session_key),
            contact_identifier: clean(&self.contact_identifier),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("client `{0}` is not registered")]
    UnknownClient(String),
    #[error("session `{0}` is not mapped to a registered client")]
    UnknownSession(String),
    #[error("no registered client knows contact `{0}`")]
    UnknownContact(String),
    #[error("no default client is registered")]
    NoDefault,
    #[error("{message}")]
    Unresolved { message: String, available_clients: Vec<String> },
}

impl From<RegistryError> for ApplicationError {
    fn from(value: RegistryError) -> Self {
        match value {
            RegistryError::Unresolved { message, available_clients } => {
                ApplicationError::ClientResolution { message, available_clients }
            }
            other => ApplicationError::ClientResolution {
                message: other.to_string(),
                available_clients: Vec::new(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Registered,
    Replaced,
    SkippedMissingCredential,
}

#[derive(Clone, Debug, Default)]
pub struct RegistryOptions {
    pub default_client: Option<ClientId>,
    pub session_ttl: Option<Duration>,
}

#[derive(Debug, Default)]
struct RegistryState {
    clients: Vec<RegisteredClient>,
    sessions: HashMap<String, SessionMapping>,
}

impl RegistryState {
    fn find(&self, client_id: &str) -> Option<&RegisteredClient> {
        self.clients.iter().find(|client| client.config.id.as_str() == client_id)
    }

    fn client_ids(&self) -> Vec<String> {
        self.clients.iter().map(|client| client.config.id.to_string()).collect()
    }
}

/// Process-wide tenant table, constructed once at startup and shared
/// through application state. Readers never block each other; admin
/// mutations take the write lock.
#[derive(Debug)]
pub struct ClientRegistry {
    factory: UpstreamFactory,
    options: RegistryOptions,
    state: RwLock<RegistryState>,
}

impl ClientRegistry {
    pub fn new(factory: UpstreamFactory, options: RegistryOptions) -> Self {
        Self { factory, options, state: RwLock::new(RegistryState::default()) }
    }

    pub async fn with_clients(
        factory: UpstreamFactory,
        options: RegistryOptions,
        clients: impl IntoIterator<Item = ClientConfig>,
    ) -> Self {
        let registry = Self::new(factory, options);
        for client in clients {
            registry.add(client).await;
        }
        registry
    }

    pub fn factory(&self) -> &UpstreamFactory {
        &self.factory
    }

    /// Registers or replaces a tenant. A tenant without a usable credential
    /// is skipped with a warning.
    pub async fn add(&self, config: ClientConfig) -> AddOutcome {
        let Some(upstream) = self.factory.build(&config) else {
            warn!(
                event_name = "registry.client.skipped",
                client_id = %config.id,
                reason = "missing_credential",
                "client not registered"
            );
            return AddOutcome::SkippedMissingCredential;
        };

        let entry = RegisteredClient { config, upstream };
        let mut state = self.state.write().await;
        let client_id = entry.config.id.clone();
        let outcome = match state.clients.iter_mut().find(|client| client.config.id == client_id) {
            Some(existing) => {
                *existing = entry;
                AddOutcome::Replaced
            }
            None => {
                state.clients.push(entry);
                AddOutcome::Registered
            }
        };

        info!(
            event_name = "registry.client.registered",
            client_id = %client_id,
            replaced = matches!(outcome, AddOutcome::Replaced),
            "client registered"
        );
        outcome
    }

    /// Removes a tenant and every session that points at it.
    pub async fn remove(&self, client_id: &str) -> bool {
        let mut state = self.state.write().await;
        let before = state.clients.len();
        state.clients.retain(|client| client.config.id.as_str() != client_id);
        let removed = state.clients.len() != before;
        if removed {
            state.sessions.retain(|_, session| session.client_id.as_str() != client_id);
            info!(event_name = "registry.client.removed", client_id, "client removed");
        }
        removed
    }

    pub async fn get(&self, client_id: &str) -> Option<RegisteredClient> {
        self.state.read().await.find(client_id).cloned()
    }

    pub async fn list(&self) -> Vec<ClientSummary> {
        self.state.read().await.clients.iter().map(|client| client.config.summary()).collect()
    }

    pub async fn client_ids(&self) -> Vec<String> {
        self.state.read().await.client_ids()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.clients.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn create_session(
        &self,
        session_key: &str,
        client_id: &str,
        contact_id: Option<String>,
    ) -> Result<SessionMapping, RegistryError> {
        let mut state = self.state.write().await;
        let Some(client) = state.find(client_id) else {
            return Err(RegistryError::UnknownClient(client_id.to_string()));
        };
        let mapping = SessionMapping::new(session_key, client.config.id.clone(), contact_id);
        state.sessions.insert(session_key.to_string(), mapping.clone());
        debug!(event_name = "registry.session.created", session_key, client_id, "session mapped");
        Ok(mapping)
    }

    pub async fn session(&self, session_key: &str) -> Option<SessionMapping> {
        let now = Utc::now();
        {
            let state = self.state.read().await;
            match state.sessions.get(session_key) {
                Some(mapping) if !mapping.is_expired(self.options.session_ttl, now) => {
                    return Some(mapping.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        self.state.write().await.sessions.remove(session_key);
        debug!(event_name = "registry.session.expired", session_key, "session expired");
        None
    }

    pub async fn sessions(&self) -> Vec<SessionMapping> {
        self.purge_expired_sessions().await;
        let state = self.state.read().await;
        let mut sessions = state.sessions.values().cloned().collect::<Vec<_>>();
        sessions.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        sessions
    }

    pub async fn remove_session(&self, session_key: &str) -> bool {
        self.state.write().await.sessions.remove(session_key).is_some()
    }

    async fn purge_expired_sessions(&self) {
        let Some(ttl) = self.options.session_ttl else {
            return;
        };
        let now = Utc::now();
        self.state.write().await.sessions.retain(|_, session| !session.is_expired(Some(ttl), now));
    }

    pub async fn resolve_by_client_id(&self, client_id: &str) -> Result<ResolvedClient, RegistryError> {
        self.get(client_id)
            .await
            .map(|client| ResolvedClient::from_registered(client, ResolutionSource::ClientId, None))
            .ok_or_else(|| RegistryError::UnknownClient(client_id.to_string()))
    }

    pub async fn resolve_by_session(&self, session_key: &str) -> Result<ResolvedClient, RegistryError> {
        let mapping = self
            .session(session_key)
            .await
            .ok_or_else(|| RegistryError::UnknownSession(session_key.to_string()))?;
        let client = self
            .get(mapping.client_id.as_str())
            .await
            .ok_or_else(|| RegistryError::UnknownSession(session_key.to_string()))?;
        Ok(ResolvedClient::from_registered(client, ResolutionSource::Session, mapping.contact_id))
    }

    /// Cross-tenant scan in registration order: direct fetch by id, then a
    /// search query, per client. Up to two upstream calls per tenant.
    pub async fn resolve_by_contact(&self, identifier: &str) -> Result<ResolvedClient, RegistryError> {
        let clients = self.state.read().await.clients.clone();

        for client in clients {
            if let Some(contact_id) = find_contact(&client.upstream, identifier).await {
                info!(
                    event_name = "registry.contact.matched",
                    client_id = %client.config.id,
                    "contact resolved to client"
                );
                return Ok(ResolvedClient::from_registered(
                    client,
                    ResolutionSource::Contact,
                    Some(contact_id),
                ));
            }
        }

        Err(RegistryError::UnknownContact(identifier.to_string()))
    }

    /// Configured default, then a client named `default`, then the first
    /// registered client.
    pub async fn resolve_default(&self) -> Result<ResolvedClient, RegistryError> {
        let state = self.state.read().await;
        let configured = self
            .options
            .default_client
            .as_ref()
            .and_then(|client_id| state.find(client_id.as_str()));
        let client = configured
            .or_else(|| state.find(leadgate_core::config::ENV_CLIENT_ID))
            .or_else(|| state.clients.first())
            .cloned()
            .ok_or(RegistryError::NoDefault)?;
        Ok(ResolvedClient::from_registered(client, ResolutionSource::Default, None))
    }

    pub async fn resolve(&self, hints: &RoutingHints) -> Result<ResolvedClient, RegistryError> {
        let hints = hints.normalized();

        if let Some(client_id) = hints.client_id.as_deref() {
            match self.resolve_by_client_id(client_id).await {
                Ok(resolved) => return Ok(resolved),
                Err(error) => debug!(event_name = "registry.resolve.miss", error = %error, "hint did not resolve"),
            }
        }

        if let Some(session_key) = hints.session_key.as_deref() {
            match self.resolve_by_session(session_key).await {
                Ok(resolved) => return Ok(resolved),
                Err(error) => debug!(event_name = "registry.resolve.miss", error = %error, "hint did not resolve"),
            }
        }

        if let Some(identifier) = hints.contact_identifier.as_deref() {
            match self.resolve_by_contact(identifier).await {
                Ok(resolved) => return Ok(resolved),
                Err(error) => debug!(event_name = "registry.resolve.miss", error = %error, "hint did not resolve"),
            }
        }

        match self.resolve_default().await {
            Ok(resolved) => Ok(resolved),
            Err(_) => Err(self.unresolved().await),
        }
    }

    async fn unresolved(&self) -> RegistryError {
        RegistryError::Unresolved {
            message: NO_CLIENT_MESSAGE.to_string(),
            available_clients: self.client_ids().await,
        }
    }
}

async fn find_contact(upstream: &UpstreamClient, identifier: &str) -> Option<String> {
    let direct = ApiRequest::get("/contacts/")
        .segment(identifier)
        .query("locationId", upstream.location_id());
    let envelope = upstream.request(&direct).await;
    if is_success(&envelope) {
        if let Some(id) = envelope.locate("contact").and_then(|found| entity_id(found.value())) {
            return Some(id);
        }
    }

    let search = ApiRequest::get("/contacts/")
        .query("locationId", upstream.location_id())
        .query("query", identifier);
    let envelope = upstream.request(&search).await;
    if !is_success(&envelope) {
        return None;
    }
    envelope
        .list("contacts")
        .and_then(|contacts| contacts.iter().find(|contact| matches_identifier(contact, identifier)))
        .and_then(entity_id)
}

/// A search hit only counts when its email or phone is the identifier itself.
fn matches_identifier(contact: &Value, identifier: &str) -> bool {
    let field = |key: &str| contact.get(key).and_then(Value::as_str);
    if field("email").is_some_and(|email| email.eq_ignore_ascii_case(identifier)) {
        return true;
    }
    let phone_like = identifier.chars().all(|c| c.is_ascii_digit() || " -()+.".contains(c));
    let digits = |value: &str| value.chars().filter(char::is_ascii_digit).collect::<String>();
    let wanted = digits(identifier);
    phone_like && wanted.len() >= 7 && field("phone").is_some_and(|phone| digits(phone).ends_with(&wanted))
}

fn is_success(envelope: &Envelope) -> bool {
    envelope.http_status().is_some_and(|status| (200..300).contains(&status))
}

fn entity_id(value: &Value) -> Option<String> {
    value.get("id").and_then(Value::as_str).filter(|id| !id.is_empty()).map(str::to_string)
}
