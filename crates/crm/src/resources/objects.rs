use leadgate_core::domain::object::{is_custom_object_key, CustomObjectRecord, CustomObjectSchema};
use leadgate_core::errors::FieldError;
use serde_json::{Map, Value};

use super::{delete_outcome, non_empty};
use crate::client::{ApiRequest, UpstreamClient};
use crate::error::CrmError;

pub struct CustomObjects<'a> {
    client: &'a UpstreamClient,
}

fn record_location(data: &Map<String, Value>) -> Option<&str> {
    non_empty(data.get("locationId").and_then(Value::as_str))
}

impl<'a> CustomObjects<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    fn location<'b>(&'b self, location_id: Option<&'b str>) -> &'b str {
        non_empty(location_id).unwrap_or(self.client.location_id())
    }

    pub async fn create_schema(&self, data: &Value) -> Result<CustomObjectSchema, CrmError> {
        let key = data.get("key").and_then(Value::as_str).unwrap_or_default();
        if !is_custom_object_key(key) {
            return Err(CrmError::Validation(vec![FieldError::new(
                "key",
                "key must start with `custom_objects.`",
            )]));
        }
        let request = ApiRequest::post("/objects/").json(data.clone());
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("object", "failed to create custom object schema")
    }

    pub async fn list_schemas(&self, location_id: Option<&str>) -> Result<Vec<CustomObjectSchema>, CrmError> {
        let request = ApiRequest::get("/objects/").query("locationId", self.location(location_id));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("objects", "failed to list objects")
    }

    pub async fn get_schema(
        &self,
        key: &str,
        location_id: Option<&str>,
    ) -> Result<CustomObjectSchema, CrmError> {
        let request = ApiRequest::get("/objects/")
            .segment(key)
            .query("locationId", self.location(location_id));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("object", "failed to get object schema by key")
    }

    pub async fn create_record(
        &self,
        schema_key: &str,
        data: &Map<String, Value>,
    ) -> Result<CustomObjectRecord, CrmError> {
        if record_location(data).is_none() {
            return Err(CrmError::required("locationId"));
        }
        let request = ApiRequest::post("/objects/")
            .segment(schema_key)
            .segment("records")
            .json(Value::Object(data.clone()));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("record", "failed to create custom object record")
    }

    pub async fn get_record(
        &self,
        schema_key: &str,
        record_id: &str,
        location_id: Option<&str>,
    ) -> Result<CustomObjectRecord, CrmError> {
        let request = ApiRequest::get("/objects/")
            .segment(schema_key)
            .segment("records")
            .segment(record_id)
            .query("locationId", self.location(location_id));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("record", "failed to get custom object record by id")
    }

    pub async fn update_record(
        &self,
        schema_key: &str,
        record_id: &str,
        data: &Map<String, Value>,
        location_id: Option<&str>,
    ) -> Result<CustomObjectRecord, CrmError> {
        let location = non_empty(location_id)
            .or_else(|| record_location(data))
            .ok_or_else(|| CrmError::required("locationId"))?;
        let request = ApiRequest::put("/objects/")
            .segment(schema_key)
            .segment("records")
            .segment(record_id)
            .query("locationId", location)
            .json(Value::Object(data.clone()));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("record", "failed to update custom object record")
    }

    pub async fn delete_record(&self, schema_key: &str, record_id: &str) -> Result<bool, CrmError> {
        let request = ApiRequest::delete("/objects/")
            .segment(schema_key)
            .segment("records")
            .segment(record_id);
        delete_outcome(self.client, &request).await
    }
}
