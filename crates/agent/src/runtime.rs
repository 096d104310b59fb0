//! Structured action dispatch behind `/execute-agent`.
//!
//! A request is first turned into an [`ActionPlan`] without touching the
//! network (explicit `action`, or the intent classifier over `input`). The
//! plan is then executed against the resolved tenant.

use std::fmt;
use std::str::FromStr;

use leadgate_core::domain::business::BusinessInput;
use leadgate_core::domain::contact::ContactInput;
use leadgate_core::errors::{ApplicationError, FieldError};
use leadgate_crm::resources::OutboundMessage;
use leadgate_crm::{ResolvedClient, RoutingHints, UpstreamClient};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::intent::{Intent, IntentClassifier, SUPPORTED_PHRASES};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub session_key: Option<String>,
    #[serde(default, alias = "contactId")]
    pub contact_identifier: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

impl ExecuteRequest {
    pub fn routing_hints(&self) -> RoutingHints {
        RoutingHints {
            client_id: self.client_id.clone(),
            session_key: self.session_key.clone(),
            contact_identifier: self.contact_identifier.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Contacts,
    Businesses,
    Tasks,
    Organizations,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contacts => "contacts",
            Self::Businesses => "businesses",
            Self::Tasks => "tasks",
            Self::Organizations => "organizations",
        }
    }

    pub fn supports(self, action: Action) -> bool {
        use Action::*;
        match self {
            Self::Contacts => {
                matches!(action, Create | Update | Get | List | Delete | Upsert | SendMessage)
            }
            Self::Businesses | Self::Tasks => matches!(action, Create | Update | Get | List | Delete),
            Self::Organizations => matches!(action, Get | List),
        }
    }
}

impl FromStr for Resource {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "contacts" | "contact" => Ok(Self::Contacts),
            "businesses" | "business" => Ok(Self::Businesses),
            "tasks" | "task" => Ok(Self::Tasks),
            "organizations" | "organization" => Ok(Self::Organizations),
            other => Err(invalid("resource", format!("unsupported resource `{other}`"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Get,
    List,
    Delete,
    Upsert,
    SendMessage,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Get => "get",
            Self::List => "list",
            Self::Delete => "delete",
            Self::Upsert => "upsert",
            Self::SendMessage => "send_message",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "get" => Ok(Self::Get),
            "list" => Ok(Self::List),
            "delete" => Ok(Self::Delete),
            "upsert" => Ok(Self::Upsert),
            "send_message" | "send" => Ok(Self::SendMessage),
            other => Err(invalid("action", format!("unsupported action `{other}`"))),
        }
    }
}

/// How to find the target contact when the request names no id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContactLookup {
    Email(String),
    Phone(String),
}

impl ContactLookup {
    fn term(&self) -> &str {
        match self {
            Self::Email(value) | Self::Phone(value) => value,
        }
    }
}

/// A validated request, ready to run against a tenant.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionPlan {
    pub resource: Resource,
    pub action: Action,
    pub data: Map<String, Value>,
    pub location_id: Option<String>,
    pub lookup: Option<ContactLookup>,
    /// Classifier key when the plan came from free text.
    pub intent: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
    pub action: String,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AgentRuntime {
    classifier: IntentClassifier,
}

impl AgentRuntime {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self { classifier: IntentClassifier::new()? })
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn plan(&self, request: &ExecuteRequest) -> Result<ActionPlan, ApplicationError> {
        let data = match &request.data {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(invalid("data", "data must be a JSON object")),
        };
        let location_id = clean(request.location_id.as_deref());

        let explicit_action = clean(request.action.as_deref());
        let free_text = clean(request.input.as_deref());

        match (explicit_action, free_text) {
            (Some(action), _) => {
                let resource = match clean(request.resource.as_deref()) {
                    Some(resource) => resource.parse()?,
                    None => Resource::Contacts,
                };
                let action: Action = action.parse()?;
                if !resource.supports(action) {
                    return Err(invalid(
                        "action",
                        format!("action `{action}` is not supported for {}", resource.as_str()),
                    ));
                }
                Ok(ActionPlan { resource, action, data, location_id, lookup: None, intent: None })
            }
            (None, Some(text)) => self.plan_from_text(&text, data, location_id),
            (None, None) => Err(ApplicationError::validation(vec![FieldError::new(
                "action",
                "action is required (or provide input text)",
            )])),
        }
    }

    fn plan_from_text(
        &self,
        text: &str,
        mut data: Map<String, Value>,
        location_id: Option<String>,
    ) -> Result<ActionPlan, ApplicationError> {
        let intent = self.classifier.classify(text);
        let key = intent.action_key();
        let (action, lookup) = match intent {
            Intent::Create(draft) => {
                merge(&mut data, &draft);
                let missing: Vec<_> = ["firstName", "lastName", "email"]
                    .into_iter()
                    .filter(|field| !data.contains_key(*field))
                    .map(FieldError::required)
                    .collect();
                if !missing.is_empty() {
                    return Err(ApplicationError::validation(missing));
                }
                (Action::Create, None)
            }
            Intent::Update { email, changes } => {
                if changes.is_empty() && data.is_empty() {
                    return Err(invalid("input", "no contact changes found in input"));
                }
                merge(&mut data, &changes);
                (Action::Update, email.map(ContactLookup::Email))
            }
            Intent::Search { email } => (Action::Get, email.map(ContactLookup::Email)),
            Intent::SendMessage { phone, message } => {
                if let Some(message) = message {
                    data.entry("message").or_insert(Value::String(message));
                }
                if !data.contains_key("message") {
                    return Err(ApplicationError::validation(vec![FieldError::required("message")]));
                }
                (Action::SendMessage, phone.map(ContactLookup::Phone))
            }
            Intent::Unrecognized => {
                return Err(invalid(
                    "input",
                    format!("Unrecognized action. Supported actions: {SUPPORTED_PHRASES}"),
                ));
            }
        };

        Ok(ActionPlan {
            resource: Resource::Contacts,
            action,
            data,
            location_id,
            lookup,
            intent: Some(key),
        })
    }

    pub async fn execute(
        &self,
        resolved: &ResolvedClient,
        plan: ActionPlan,
    ) -> Result<ExecuteOutcome, ApplicationError> {
        let upstream = &resolved.upstream;
        // Request locationId, then data.locationId, then the tenant's own.
        let location = plan
            .location_id
            .clone()
            .or_else(|| clean(plan.data.get("locationId").and_then(Value::as_str)))
            .unwrap_or_else(|| resolved.config.location_id.clone());

        info!(
            event_name = "agent.action.dispatched",
            client_id = %resolved.client_id,
            resolved_by = %resolved.source,
            resource = plan.resource.as_str(),
            action = plan.action.as_str(),
            intent = plan.intent.unwrap_or("none"),
            "dispatching agent action"
        );

        let target = Target::new(&plan, resolved);
        let action = plan.action;
        let (data, contact_id) = match plan.resource {
            Resource::Contacts => contacts(upstream, plan, &location, target).await?,
            Resource::Businesses => (businesses(upstream, plan, &location, target).await?, None),
            Resource::Tasks => (tasks(upstream, plan, target).await?, None),
            Resource::Organizations => (organizations(upstream, plan, target).await?, None),
        };

        Ok(ExecuteOutcome { action: action.as_str().to_string(), data, contact_id })
    }
}

/// Entity id the action applies to: `data.id`, the resource-specific id
/// key, then (contacts only) the contact learned during resolution.
#[derive(Clone, Debug, Default)]
struct Target {
    id: Option<String>,
}

impl Target {
    fn new(plan: &ActionPlan, resolved: &ResolvedClient) -> Self {
        let from_data = |key: &str| clean(plan.data.get(key).and_then(Value::as_str));
        let id = from_data("id")
            .or_else(|| match plan.resource {
                Resource::Contacts => from_data("contactId"),
                Resource::Businesses => from_data("businessId"),
                Resource::Tasks => from_data("taskId"),
                Resource::Organizations => from_data("organizationId"),
            })
            .or_else(|| match plan.resource {
                Resource::Contacts => resolved.contact_id.clone(),
                _ => None,
            });
        Self { id }
    }

    fn required(&self) -> Result<&str, ApplicationError> {
        self.id.as_deref().ok_or_else(|| ApplicationError::validation(vec![FieldError::required("id")]))
    }
}

async fn contacts(
    upstream: &UpstreamClient,
    plan: ActionPlan,
    location: &str,
    target: Target,
) -> Result<(Value, Option<String>), ApplicationError> {
    let api = upstream.contacts();
    let lookup_id = match (&target.id, &plan.lookup) {
        (None, Some(lookup)) => Some(find_contact_id(upstream, location, lookup).await?),
        _ => None,
    };
    let contact_id = target.id.clone().or(lookup_id);

    let data = match plan.action {
        Action::Create | Action::Upsert => {
            let mut input: ContactInput = decode(payload(&plan.data, &["id", "contactId"]))?;
            input.location_id = Some(location.to_string());
            let contact = match plan.action {
                Action::Upsert => api.upsert(&input).await?,
                _ => api.create(&input).await?,
            };
            let id = contact.id.clone();
            return Ok((encode(&contact)?, Some(id)));
        }
        Action::Update => {
            let id = required_id(contact_id.as_deref())?;
            let input: ContactInput = decode(payload(&plan.data, &["id", "contactId", "locationId"]))?;
            encode(&api.update(id, Some(location), &input).await?)?
        }
        Action::Get => match contact_id.as_deref() {
            Some(id) => encode(&api.get(id, Some(location)).await?)?,
            None => {
                let query = search_term(&plan.data)
                    .ok_or_else(|| ApplicationError::validation(vec![FieldError::required("id")]))?;
                let found = api.search(Some(location), &query, Some(1)).await?;
                let first = found.into_iter().next().ok_or_else(|| {
                    ApplicationError::OperationFailed(format!("Contact not found: {query}"))
                })?;
                let id = first.id.clone();
                return Ok((encode(&first)?, Some(id)));
            }
        },
        Action::List => {
            let limit =
                plan.data.get("limit").and_then(Value::as_u64).and_then(|value| u32::try_from(value).ok());
            match search_term(&plan.data) {
                Some(query) => encode(&api.search(Some(location), &query, limit).await?)?,
                None => encode(&api.list(Some(location)).await?)?,
            }
        }
        Action::Delete => {
            Value::Bool(api.delete(required_id(contact_id.as_deref())?, Some(location)).await?)
        }
        Action::SendMessage => {
            let id = required_id(contact_id.as_deref())?;
            let text = clean(plan.data.get("message").and_then(Value::as_str))
                .ok_or_else(|| ApplicationError::validation(vec![FieldError::required("message")]))?;
            let message = match clean(plan.data.get("subject").and_then(Value::as_str)) {
                Some(subject) => OutboundMessage::email(id, subject, text),
                None => OutboundMessage::sms(id, text),
            };
            upstream.conversations().send_message(&message).await?
        }
    };

    Ok((data, contact_id))
}

async fn businesses(
    upstream: &UpstreamClient,
    plan: ActionPlan,
    location: &str,
    target: Target,
) -> Result<Value, ApplicationError> {
    let api = upstream.businesses();
    match plan.action {
        Action::Create => {
            let mut input: BusinessInput = decode(payload(&plan.data, &["id", "businessId"]))?;
            input.location_id = Some(location.to_string());
            encode(&api.create(&input).await?)
        }
        Action::Update => {
            let input: BusinessInput = decode(payload(&plan.data, &["id", "businessId"]))?;
            encode(&api.update(target.required()?, &input).await?)
        }
        Action::Get => encode(&api.get_by_id(target.required()?).await?),
        Action::List => encode(&api.list_by_location(Some(location)).await?),
        Action::Delete => Ok(Value::Bool(api.delete(target.required()?).await?)),
        other => Err(unsupported(plan.resource, other)),
    }
}

async fn tasks(
    upstream: &UpstreamClient,
    plan: ActionPlan,
    target: Target,
) -> Result<Value, ApplicationError> {
    let api = upstream.tasks();
    match plan.action {
        Action::Create => {
            let body = Value::Object(payload(&plan.data, &["id", "taskId"]));
            encode(&api.create(&body).await?)
        }
        Action::Update => {
            let body = Value::Object(payload(&plan.data, &["id", "taskId"]));
            encode(&api.update(target.required()?, &body).await?)
        }
        Action::Get => encode(&api.get(target.required()?).await?),
        Action::List => encode(&api.list().await?),
        Action::Delete => Ok(Value::Bool(api.delete(target.required()?).await?)),
        other => Err(unsupported(plan.resource, other)),
    }
}

async fn organizations(
    upstream: &UpstreamClient,
    plan: ActionPlan,
    target: Target,
) -> Result<Value, ApplicationError> {
    let api = upstream.organizations();
    match plan.action {
        Action::Get => encode(&api.get(target.required()?).await?),
        Action::List => encode(&api.list().await?),
        other => Err(unsupported(plan.resource, other)),
    }
}

async fn find_contact_id(
    upstream: &UpstreamClient,
    location: &str,
    lookup: &ContactLookup,
) -> Result<String, ApplicationError> {
    let found = upstream.contacts().search(Some(location), lookup.term(), Some(10)).await?;
    let matches = |value: &Option<String>| match (lookup, value.as_deref()) {
        (ContactLookup::Email(email), Some(candidate)) => candidate.eq_ignore_ascii_case(email),
        (ContactLookup::Phone(phone), Some(candidate)) => {
            candidate.chars().filter(char::is_ascii_digit).collect::<String>().ends_with(phone.as_str())
        }
        (_, None) => false,
    };
    found
        .iter()
        .find(|contact| match lookup {
            ContactLookup::Email(_) => matches(&contact.email),
            ContactLookup::Phone(_) => matches(&contact.phone),
        })
        .map(|contact| contact.id.clone())
        .ok_or_else(|| ApplicationError::OperationFailed(format!("Contact not found: {}", lookup.term())))
}

fn search_term(data: &Map<String, Value>) -> Option<String> {
    ["query", "email", "phone"].into_iter().find_map(|key| clean(data.get(key).and_then(Value::as_str)))
}

/// `data` without routing and identity keys.
fn payload(data: &Map<String, Value>, drop: &[&str]) -> Map<String, Value> {
    data.iter()
        .filter(|(key, _)| !drop.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn merge<T: Serialize>(data: &mut Map<String, Value>, extracted: &T) {
    if let Ok(Value::Object(fields)) = serde_json::to_value(extracted) {
        for (key, value) in fields {
            data.entry(key).or_insert(value);
        }
    }
}

fn decode<T: DeserializeOwned>(data: Map<String, Value>) -> Result<T, ApplicationError> {
    serde_json::from_value(Value::Object(data))
        .map_err(|error| invalid("data", format!("invalid data: {error}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ApplicationError> {
    serde_json::to_value(value).map_err(|error| ApplicationError::OperationFailed(error.to_string()))
}

fn required_id(id: Option<&str>) -> Result<&str, ApplicationError> {
    id.ok_or_else(|| ApplicationError::validation(vec![FieldError::required("id")]))
}

fn unsupported(resource: Resource, action: Action) -> ApplicationError {
    invalid("action", format!("action `{action}` is not supported for {}", resource.as_str()))
}

fn invalid(field: &str, message: impl Into<String>) -> ApplicationError {
    ApplicationError::validation(vec![FieldError::new(field, message)])
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}
