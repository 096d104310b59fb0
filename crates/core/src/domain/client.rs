use std::fmt;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One onboarded tenant: which credential to present upstream and which
/// location (sub-account) the credential is scoped to.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub id: ClientId,
    pub credential: Option<SecretString>,
    pub location_id: String,
    pub display_name: Option<String>,
}

impl ClientConfig {
    pub fn new(
        id: impl Into<ClientId>,
        credential: Option<SecretString>,
        location_id: impl Into<String>,
    ) -> Self {
        Self { id: id.into(), credential, location_id: location_id.into(), display_name: None }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn has_credential(&self) -> bool {
        use secrecy::ExposeSecret;

        self.credential.as_ref().map(|value| !value.expose_secret().trim().is_empty()).unwrap_or(false)
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn summary(&self) -> ClientSummary {
        ClientSummary {
            id: self.id.clone(),
            location_id: self.location_id.clone(),
            display_name: self.display_name().to_string(),
            has_credential: self.has_credential(),
        }
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Redacted view of a [`ClientConfig`] safe to hand back over the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: ClientId,
    pub location_id: String,
    pub display_name: String,
    pub has_credential: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMapping {
    pub session_key: String,
    pub client_id: ClientId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionMapping {
    pub fn new(
        session_key: impl Into<String>,
        client_id: ClientId,
        contact_id: Option<String>,
    ) -> Self {
        Self { session_key: session_key.into(), client_id, contact_id, created_at: Utc::now() }
    }

    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        match ttl {
            Some(ttl) => now - self.created_at >= ttl,
            None => false,
        }
    }
}
