//! Tool catalog served over the MCP envelope. Each tool validates its
//! arguments, then makes one call through the tenant's resource wrappers.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use leadgate_core::domain::association::RelationQuery;
use leadgate_core::domain::business::BusinessInput;
use leadgate_core::domain::contact::ContactInput;
use leadgate_crm::resources::{OutboundMessage, DEFAULT_PAGE_LIMIT};
use leadgate_crm::UpstreamClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, client: &UpstreamClient, input: Value) -> Result<Value>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry preloaded with every CRM tool.
    pub fn with_crm_tools() -> Self {
        let mut registry = Self::default();
        for kind in CrmToolKind::ALL {
            registry.register(CrmTool::new(kind));
        }
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    pub async fn call(&self, name: &str, client: &UpstreamClient, input: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| anyhow!("Unknown tool: {name}"))?;
        tool.execute(client, input).await
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrmToolKind {
    SearchContacts,
    GetContact,
    CreateContact,
    UpdateContact,
    DeleteContact,
    UpsertContact,
    AddContactTag,
    RemoveContactTag,
    GetTask,
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    GetBusiness,
    ListBusinesses,
    CreateBusiness,
    UpdateBusiness,
    DeleteBusiness,
    GetOrganization,
    ListOrganizations,
    ListAssociations,
    GetAssociation,
    CreateRelation,
    ListRelations,
    ListCustomObjects,
    GetCustomObjectSchema,
    CreateCustomObjectRecord,
    GetCustomObjectRecord,
    UpdateCustomObjectRecord,
    DeleteCustomObjectRecord,
    SendSms,
    SendEmail,
}

impl CrmToolKind {
    pub const ALL: [Self; 32] = [
        Self::SearchContacts,
        Self::GetContact,
        Self::CreateContact,
        Self::UpdateContact,
        Self::DeleteContact,
        Self::UpsertContact,
        Self::AddContactTag,
        Self::RemoveContactTag,
        Self::GetTask,
        Self::ListTasks,
        Self::CreateTask,
        Self::UpdateTask,
        Self::DeleteTask,
        Self::GetBusiness,
        Self::ListBusinesses,
        Self::CreateBusiness,
        Self::UpdateBusiness,
        Self::DeleteBusiness,
        Self::GetOrganization,
        Self::ListOrganizations,
        Self::ListAssociations,
        Self::GetAssociation,
        Self::CreateRelation,
        Self::ListRelations,
        Self::ListCustomObjects,
        Self::GetCustomObjectSchema,
        Self::CreateCustomObjectRecord,
        Self::GetCustomObjectRecord,
        Self::UpdateCustomObjectRecord,
        Self::DeleteCustomObjectRecord,
        Self::SendSms,
        Self::SendEmail,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SearchContacts => "search_contacts",
            Self::GetContact => "get_contact",
            Self::CreateContact => "create_contact",
            Self::UpdateContact => "update_contact",
            Self::DeleteContact => "delete_contact",
            Self::UpsertContact => "upsert_contact",
            Self::AddContactTag => "add_contact_tag",
            Self::RemoveContactTag => "remove_contact_tag",
            Self::GetTask => "get_task",
            Self::ListTasks => "list_tasks",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::DeleteTask => "delete_task",
            Self::GetBusiness => "get_business",
            Self::ListBusinesses => "list_businesses",
            Self::CreateBusiness => "create_business",
            Self::UpdateBusiness => "update_business",
            Self::DeleteBusiness => "delete_business",
            Self::GetOrganization => "get_organization",
            Self::ListOrganizations => "list_organizations",
            Self::ListAssociations => "list_associations",
            Self::GetAssociation => "get_association",
            Self::CreateRelation => "create_relation",
            Self::ListRelations => "list_relations",
            Self::ListCustomObjects => "list_custom_objects",
            Self::GetCustomObjectSchema => "get_custom_object_schema",
            Self::CreateCustomObjectRecord => "create_custom_object_record",
            Self::GetCustomObjectRecord => "get_custom_object_record",
            Self::UpdateCustomObjectRecord => "update_custom_object_record",
            Self::DeleteCustomObjectRecord => "delete_custom_object_record",
            Self::SendSms => "send_sms",
            Self::SendEmail => "send_email",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::SearchContacts => "Search contacts by email, phone, or name",
            Self::GetContact => "Get a contact by id",
            Self::CreateContact => "Create a new contact",
            Self::UpdateContact => "Update an existing contact",
            Self::DeleteContact => "Delete a contact",
            Self::UpsertContact => "Create or update a contact matched by email",
            Self::AddContactTag => "Add tags to a contact",
            Self::RemoveContactTag => "Remove tags from a contact",
            Self::GetTask => "Get a task by id",
            Self::ListTasks => "List tasks",
            Self::CreateTask => "Create a task for a contact",
            Self::UpdateTask => "Update an existing task",
            Self::DeleteTask => "Delete a task",
            Self::GetBusiness => "Get a business by id",
            Self::ListBusinesses => "List businesses for a location",
            Self::CreateBusiness => "Create a business",
            Self::UpdateBusiness => "Update a business",
            Self::DeleteBusiness => "Delete a business",
            Self::GetOrganization => "Get an organization by id",
            Self::ListOrganizations => "List organizations",
            Self::ListAssociations => "List association types for a location",
            Self::GetAssociation => "Get an association type by id",
            Self::CreateRelation => "Link two records under an association",
            Self::ListRelations => "List relations for a record",
            Self::ListCustomObjects => "List custom object schemas for a location",
            Self::GetCustomObjectSchema => "Get a custom object schema by key",
            Self::CreateCustomObjectRecord => "Create a custom object record",
            Self::GetCustomObjectRecord => "Get a custom object record by id",
            Self::UpdateCustomObjectRecord => "Update a custom object record",
            Self::DeleteCustomObjectRecord => "Delete a custom object record",
            Self::SendSms => "Send an SMS message to a contact",
            Self::SendEmail => "Send an email to a contact",
        }
    }

    pub fn input_schema(self) -> Value {
        const LOCATION: Prop = ("locationId", "string", "Location id (defaults to the client's location)");
        const CONTACT_ID: Prop = ("contactId", "string", "Contact id");
        const TASK_ID: Prop = ("taskId", "string", "Task id");
        const BUSINESS_ID: Prop = ("businessId", "string", "Business id");
        const CONTACT_FIELDS: [Prop; 5] = [
            ("email", "string", "Contact's email address"),
            ("firstName", "string", "Contact's first name"),
            ("lastName", "string", "Contact's last name"),
            ("phone", "string", "Contact's phone number"),
            ("companyName", "string", "Contact's company name"),
        ];
        const TASK_FIELDS: [Prop; 4] = [
            ("title", "string", "Task title"),
            ("body", "string", "Task description"),
            ("dueDate", "string", "Due date (ISO 8601)"),
            ("completed", "boolean", "Whether the task is done"),
        ];
        const BUSINESS_FIELDS: [Prop; 5] = [
            ("name", "string", "Business name"),
            ("phone", "string", "Business phone"),
            ("email", "string", "Business email"),
            ("website", "string", "Business website"),
            ("description", "string", "Business description"),
        ];
        const SCHEMA_KEY: Prop = ("schemaKey", "string", "Custom object key, e.g. custom_objects.pets");
        const RECORD_ID: Prop = ("recordId", "string", "Record id");
        const PROPERTIES: Prop = ("properties", "object", "Record field values");
        const TAGS: Prop = ("tags", "array", "Tag names");

        match self {
            Self::SearchContacts => schema(
                &[
                    ("query", "string", "Search term (email, phone, or name)"),
                    ("limit", "number", "Maximum number of results"),
                    LOCATION,
                ],
                &["query"],
            ),
            Self::GetContact | Self::DeleteContact => schema(&[CONTACT_ID, LOCATION], &["contactId"]),
            Self::CreateContact | Self::UpsertContact => {
                schema(&with(&CONTACT_FIELDS, &[LOCATION]), &["email", "firstName", "lastName"])
            }
            Self::UpdateContact => {
                schema(&with(&with(&[CONTACT_ID], &CONTACT_FIELDS), &[LOCATION]), &["contactId"])
            }
            Self::AddContactTag | Self::RemoveContactTag => {
                schema(&[CONTACT_ID, TAGS], &["contactId", "tags"])
            }
            Self::GetTask | Self::DeleteTask => schema(&[TASK_ID], &["taskId"]),
            Self::ListTasks | Self::ListOrganizations => schema(&[], &[]),
            Self::CreateTask => schema(&with(&[CONTACT_ID], &TASK_FIELDS), &["contactId", "title"]),
            Self::UpdateTask => {
                schema(&with(&[TASK_ID], &TASK_FIELDS), &["taskId"])
            }
            Self::GetBusiness | Self::DeleteBusiness => schema(&[BUSINESS_ID], &["businessId"]),
            Self::ListBusinesses | Self::ListCustomObjects => schema(&[LOCATION], &[]),
            Self::CreateBusiness => schema(&with(&BUSINESS_FIELDS, &[LOCATION]), &["name"]),
            Self::UpdateBusiness => schema(&with(&[BUSINESS_ID], &BUSINESS_FIELDS), &["businessId"]),
            Self::GetOrganization => {
                schema(&[("organizationId", "string", "Organization id")], &["organizationId"])
            }
            Self::ListAssociations => schema(
                &[LOCATION, ("skip", "number", "Items to skip"), ("limit", "number", "Page size")],
                &[],
            ),
            Self::GetAssociation => {
                schema(&[("associationId", "string", "Association id")], &["associationId"])
            }
            Self::CreateRelation => schema(
                &[
                    ("associationId", "string", "Association id"),
                    ("firstRecordId", "string", "First record id"),
                    ("secondRecordId", "string", "Second record id"),
                    LOCATION,
                ],
                &["associationId", "firstRecordId", "secondRecordId"],
            ),
            Self::ListRelations => schema(
                &[
                    RECORD_ID,
                    LOCATION,
                    ("skip", "number", "Items to skip"),
                    ("limit", "number", "Page size"),
                    ("associationIds", "array", "Only relations under these associations"),
                ],
                &["recordId"],
            ),
            Self::GetCustomObjectSchema => schema(
                &[("key", "string", "Custom object key, e.g. custom_objects.pets"), LOCATION],
                &["key"],
            ),
            Self::CreateCustomObjectRecord => {
                schema(&[SCHEMA_KEY, PROPERTIES, LOCATION], &["schemaKey", "properties"])
            }
            Self::GetCustomObjectRecord => {
                schema(&[SCHEMA_KEY, RECORD_ID, LOCATION], &["schemaKey", "recordId"])
            }
            Self::UpdateCustomObjectRecord => schema(
                &[SCHEMA_KEY, RECORD_ID, PROPERTIES, LOCATION],
                &["schemaKey", "recordId", "properties"],
            ),
            Self::DeleteCustomObjectRecord => {
                schema(&[SCHEMA_KEY, RECORD_ID], &["schemaKey", "recordId"])
            }
            Self::SendSms => schema(
                &[CONTACT_ID, ("message", "string", "Message content")],
                &["contactId", "message"],
            ),
            Self::SendEmail => schema(
                &[
                    CONTACT_ID,
                    ("subject", "string", "Email subject"),
                    ("body", "string", "Email body"),
                ],
                &["contactId", "subject", "body"],
            ),
        }
    }
}

/// `(name, json type, description)`.
type Prop = (&'static str, &'static str, &'static str);

fn with(base: &[Prop], extra: &[Prop]) -> Vec<Prop> {
    base.iter().chain(extra).copied().collect()
}

fn schema(properties: &[Prop], required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .iter()
        .map(|(name, kind, description)| {
            let mut property = json!({ "type": kind, "description": description });
            if *kind == "array" {
                property["items"] = json!({ "type": "string" });
            }
            (name.to_string(), property)
        })
        .collect();
    json!({ "type": "object", "properties": properties, "required": required })
}

/// One catalog entry backed by the CRM resource wrappers.
#[derive(Clone, Copy, Debug)]
pub struct CrmTool {
    kind: CrmToolKind,
}

impl CrmTool {
    pub fn new(kind: CrmToolKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Tool for CrmTool {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn description(&self) -> &'static str {
        self.kind.description()
    }

    fn input_schema(&self) -> Value {
        self.kind.input_schema()
    }

    async fn execute(&self, client: &UpstreamClient, input: Value) -> Result<Value> {
        let args = Arguments::parse(input)?;
        let location = args.optional("locationId");

        match self.kind {
            CrmToolKind::SearchContacts => {
                let query = args
                    .optional("query")
                    .or_else(|| args.optional("search"))
                    .ok_or_else(|| anyhow!("`query` is required"))?;
                to_value(client.contacts().search(location, query, args.number("limit")).await?)
            }
            CrmToolKind::GetContact => {
                to_value(client.contacts().get(args.required("contactId")?, location).await?)
            }
            CrmToolKind::CreateContact => {
                let input = args.contact_input(client)?;
                to_value(client.contacts().create(&input).await?)
            }
            CrmToolKind::UpsertContact => {
                let input = args.contact_input(client)?;
                to_value(client.contacts().upsert(&input).await?)
            }
            CrmToolKind::UpdateContact => {
                let contact_id = args.required("contactId")?;
                let input = args.decode::<ContactInput>(&["contactId", "locationId"])?;
                to_value(client.contacts().update(contact_id, location, &input).await?)
            }
            CrmToolKind::DeleteContact => {
                let deleted = client.contacts().delete(args.required("contactId")?, location).await?;
                Ok(json!({ "deleted": deleted }))
            }
            CrmToolKind::AddContactTag => {
                let tags = client.contacts().add_tags(args.required("contactId")?, &args.strings("tags")?).await?;
                Ok(json!({ "tags": tags }))
            }
            CrmToolKind::RemoveContactTag => {
                let tags =
                    client.contacts().remove_tags(args.required("contactId")?, &args.strings("tags")?).await?;
                Ok(json!({ "tags": tags }))
            }
            CrmToolKind::GetTask => to_value(client.tasks().get(args.required("taskId")?).await?),
            CrmToolKind::ListTasks => to_value(client.tasks().list().await?),
            CrmToolKind::CreateTask => {
                args.required("contactId")?;
                args.required("title")?;
                to_value(client.tasks().create(&Value::Object(args.without(&[]))).await?)
            }
            CrmToolKind::UpdateTask => {
                let task_id = args.required("taskId")?;
                to_value(client.tasks().update(task_id, &Value::Object(args.without(&["taskId"]))).await?)
            }
            CrmToolKind::DeleteTask => {
                let deleted = client.tasks().delete(args.required("taskId")?).await?;
                Ok(json!({ "deleted": deleted }))
            }
            CrmToolKind::GetBusiness => {
                to_value(client.businesses().get_by_id(args.required("businessId")?).await?)
            }
            CrmToolKind::ListBusinesses => to_value(client.businesses().list_by_location(location).await?),
            CrmToolKind::CreateBusiness => {
                let mut input = args.decode::<BusinessInput>(&[])?;
                if input.location_id.is_none() {
                    input.location_id = Some(client.location_id().to_string());
                }
                to_value(client.businesses().create(&input).await?)
            }
            CrmToolKind::UpdateBusiness => {
                let business_id = args.required("businessId")?;
                let input = args.decode::<BusinessInput>(&["businessId"])?;
                to_value(client.businesses().update(business_id, &input).await?)
            }
            CrmToolKind::DeleteBusiness => {
                let deleted = client.businesses().delete(args.required("businessId")?).await?;
                Ok(json!({ "deleted": deleted }))
            }
            CrmToolKind::GetOrganization => {
                to_value(client.organizations().get(args.required("organizationId")?).await?)
            }
            CrmToolKind::ListOrganizations => to_value(client.organizations().list().await?),
            CrmToolKind::ListAssociations => {
                let skip = args.number("skip").unwrap_or(0);
                let limit = args.number("limit").unwrap_or(DEFAULT_PAGE_LIMIT);
                to_value(client.associations().list_associations(location, skip, limit).await?)
            }
            CrmToolKind::GetAssociation => {
                to_value(client.associations().get_association(args.required("associationId")?).await?)
            }
            CrmToolKind::CreateRelation => {
                for field in ["associationId", "firstRecordId", "secondRecordId"] {
                    args.required(field)?;
                }
                let mut body = args.without(&[]);
                body.insert(
                    "locationId".to_string(),
                    Value::String(location.unwrap_or(client.location_id()).to_string()),
                );
                to_value(client.associations().create_relation(&Value::Object(body)).await?)
            }
            CrmToolKind::ListRelations => {
                let query = RelationQuery {
                    skip: args.number("skip").unwrap_or(0),
                    limit: args.number("limit").unwrap_or(0),
                    association_ids: args.optional_strings("associationIds")?,
                };
                to_value(
                    client.associations().list_relations(args.required("recordId")?, location, &query).await?,
                )
            }
            CrmToolKind::ListCustomObjects => to_value(client.objects().list_schemas(location).await?),
            CrmToolKind::GetCustomObjectSchema => {
                to_value(client.objects().get_schema(args.required("key")?, location).await?)
            }
            CrmToolKind::CreateCustomObjectRecord => {
                let schema_key = args.required("schemaKey")?;
                let data = args.record_body(location.unwrap_or(client.location_id()))?;
                to_value(client.objects().create_record(schema_key, &data).await?)
            }
            CrmToolKind::GetCustomObjectRecord => to_value(
                client
                    .objects()
                    .get_record(args.required("schemaKey")?, args.required("recordId")?, location)
                    .await?,
            ),
            CrmToolKind::UpdateCustomObjectRecord => {
                let location = location.unwrap_or(client.location_id());
                let data = args.record_body(location)?;
                to_value(
                    client
                        .objects()
                        .update_record(
                            args.required("schemaKey")?,
                            args.required("recordId")?,
                            &data,
                            Some(location),
                        )
                        .await?,
                )
            }
            CrmToolKind::DeleteCustomObjectRecord => {
                let deleted = client
                    .objects()
                    .delete_record(args.required("schemaKey")?, args.required("recordId")?)
                    .await?;
                Ok(json!({ "deleted": deleted }))
            }
            CrmToolKind::SendSms => {
                let message = OutboundMessage::sms(args.required("contactId")?, args.required("message")?);
                Ok(client.conversations().send_message(&message).await?)
            }
            CrmToolKind::SendEmail => {
                let message = OutboundMessage::email(
                    args.required("contactId")?,
                    args.required("subject")?,
                    args.required("body")?,
                );
                Ok(client.conversations().send_message(&message).await?)
            }
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

struct Arguments(Map<String, Value>);

impl Arguments {
    fn parse(input: Value) -> Result<Self> {
        match input {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self(Map::new())),
            _ => bail!("tool arguments must be a JSON object"),
        }
    }

    fn optional(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.optional(key).ok_or_else(|| anyhow!("`{key}` is required"))
    }

    fn number(&self, key: &str) -> Option<u32> {
        match self.0.get(key)? {
            Value::Number(number) => number.as_u64().and_then(|value| u32::try_from(value).ok()),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn strings(&self, key: &str) -> Result<Vec<String>> {
        let values = self.optional_strings(key)?;
        if values.is_empty() {
            bail!("`{key}` is required");
        }
        Ok(values)
    }

    /// Accepts an array of strings or a single string.
    fn optional_strings(&self, key: &str) -> Result<Vec<String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(value)) => Ok(vec![value.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| anyhow!("`{key}` must contain only strings"))
                })
                .collect(),
            Some(_) => bail!("`{key}` must be an array of strings"),
        }
    }

    fn without(&self, keys: &[&str]) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(key, _)| !keys.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn decode<T: DeserializeOwned>(&self, skip: &[&str]) -> Result<T> {
        serde_json::from_value(Value::Object(self.without(skip))).context("invalid tool arguments")
    }

    fn contact_input(&self, client: &UpstreamClient) -> Result<ContactInput> {
        for field in ["email", "firstName", "lastName"] {
            self.required(field)?;
        }
        let mut input = self.decode::<ContactInput>(&[])?;
        if !input.has_location() {
            input.location_id = Some(client.location_id().to_string());
        }
        Ok(input)
    }

    fn record_body(&self, location_id: &str) -> Result<Map<String, Value>> {
        let properties = match self.0.get("properties") {
            Some(Value::Object(properties)) => properties.clone(),
            _ => bail!("`properties` must be an object"),
        };
        let mut body = Map::new();
        body.insert("locationId".to_string(), Value::String(location_id.to_string()));
        body.insert("properties".to_string(), Value::Object(properties));
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use leadgate_core::domain::client::ClientConfig;
    use leadgate_core::retry::RetryPolicy;
    use leadgate_crm::{RecordingSleeper, UpstreamClient, UpstreamFactory, UpstreamSettings};
    use secrecy::SecretString;
    use serde_json::json;

    use super::{Arguments, CrmToolKind, ToolRegistry};

    fn offline_client() -> UpstreamClient {
        let factory = UpstreamFactory::new(
            UpstreamSettings {
                base_url: "http://127.0.0.1:1".to_string(),
                api_version: "2021-07-28".to_string(),
                timeout: Duration::from_millis(200),
            },
            RetryPolicy::disabled(),
            Arc::new(RecordingSleeper::new()),
        )
        .expect("factory should build");
        factory
            .build(&ClientConfig::new("client_a", Some(SecretString::from("pit-a")), "loc-a"))
            .expect("client should build")
    }

    #[test]
    fn catalog_has_unique_names_and_object_schemas() {
        let registry = ToolRegistry::with_crm_tools();
        let descriptors = registry.descriptors();

        assert_eq!(registry.len(), CrmToolKind::ALL.len());
        let names: HashSet<_> = descriptors.iter().map(|tool| tool.name.clone()).collect();
        assert_eq!(names.len(), descriptors.len());
        for expected in ["search_contacts", "upsert_contact", "list_relations", "send_email"] {
            assert!(names.contains(expected), "missing {expected}");
        }
        assert!(descriptors.iter().all(|tool| tool.input_schema["type"] == "object"));
    }

    #[test]
    fn required_fields_are_declared_in_schema() {
        let schema = CrmToolKind::CreateContact.input_schema();
        assert_eq!(schema["required"], json!(["email", "firstName", "lastName"]));
        assert_eq!(CrmToolKind::AddContactTag.input_schema()["properties"]["tags"]["items"]["type"], "string");
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::with_crm_tools();
        let error = registry
            .call("book_appointment", &offline_client(), json!({}))
            .await
            .expect_err("unknown tool should fail");
        assert_eq!(error.to_string(), "Unknown tool: book_appointment");
    }

    #[tokio::test]
    async fn missing_argument_fails_before_any_upstream_call() {
        let registry = ToolRegistry::with_crm_tools();
        let error = registry
            .call("get_contact", &offline_client(), json!({ "locationId": "loc-a" }))
            .await
            .expect_err("missing contactId should fail");
        assert!(format!("{error:#}").contains("`contactId` is required"));
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let registry = ToolRegistry::with_crm_tools();
        let error = registry
            .call("list_tasks", &offline_client(), json!([1, 2]))
            .await
            .expect_err("array arguments should fail");
        assert!(error.to_string().contains("must be a JSON object"));
    }

    #[test]
    fn string_lists_accept_single_values() {
        let args = Arguments::parse(json!({ "tags": "vip", "ids": ["a", "b"], "bad": [1] }))
            .expect("object parses");

        assert_eq!(args.strings("tags").expect("single tag"), vec!["vip".to_owned()]);
        assert_eq!(args.optional_strings("ids").expect("ids").len(), 2);
        assert!(args.optional_strings("bad").is_err());
        assert!(args.strings("missing").is_err());
    }

    #[test]
    fn numbers_accept_numeric_strings() {
        let args = Arguments::parse(json!({ "limit": "25", "skip": 5, "neg": -1 })).expect("object parses");

        assert_eq!(args.number("limit"), Some(25));
        assert_eq!(args.number("skip"), Some(5));
        assert_eq!(args.number("neg"), None);
    }
}
