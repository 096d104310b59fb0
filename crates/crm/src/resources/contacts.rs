use leadgate_core::domain::contact::{BusinessContactsQuery, Contact, ContactInput};
use serde_json::json;

use super::{delete_outcome, non_empty, to_body};
use crate::client::{ApiRequest, UpstreamClient};
use crate::error::CrmError;

pub struct Contacts<'a> {
    client: &'a UpstreamClient,
}

impl<'a> Contacts<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    fn location<'b>(&'b self, location_id: Option<&'b str>) -> &'b str {
        non_empty(location_id).unwrap_or(self.client.location_id())
    }

    pub async fn list(&self, location_id: Option<&str>) -> Result<Vec<Contact>, CrmError> {
        let request = ApiRequest::get("/contacts/").query("locationId", self.location(location_id));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("contacts", "failed to fetch contacts")
    }

    pub async fn get(&self, contact_id: &str, location_id: Option<&str>) -> Result<Contact, CrmError> {
        let request = ApiRequest::get("/contacts/")
            .segment(contact_id)
            .query("locationId", self.location(location_id));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("contact", "failed to fetch contact")
    }

    pub async fn create(&self, input: &ContactInput) -> Result<Contact, CrmError> {
        if !input.has_location() {
            return Err(CrmError::required("locationId"));
        }
        let request = ApiRequest::post("/contacts/").json(to_body(input)?);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("contact", "failed to create contact")
    }

    pub async fn update(
        &self,
        contact_id: &str,
        location_id: Option<&str>,
        input: &ContactInput,
    ) -> Result<Contact, CrmError> {
        let request = ApiRequest::put("/contacts/")
            .segment(contact_id)
            .query("locationId", self.location(location_id))
            .json(to_body(input)?);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("contact", "failed to update contact")
    }

    pub async fn delete(&self, contact_id: &str, location_id: Option<&str>) -> Result<bool, CrmError> {
        let request = ApiRequest::delete("/contacts/")
            .segment(contact_id)
            .query("locationId", self.location(location_id));
        delete_outcome(self.client, &request).await
    }

    /// Same email on repeat calls resolves to the same upstream id.
    pub async fn upsert(&self, input: &ContactInput) -> Result<Contact, CrmError> {
        if !input.has_location() {
            return Err(CrmError::required("locationId"));
        }
        let request = ApiRequest::post("/contacts/upsert").json(to_body(input)?);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("contact", "failed to upsert contact")
    }

    pub async fn search(
        &self,
        location_id: Option<&str>,
        query: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Contact>, CrmError> {
        let request = ApiRequest::get("/contacts/")
            .query("locationId", self.location(location_id))
            .query("query", query)
            .query_opt("limit", limit);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("contacts", "failed to search contacts")
    }

    pub async fn list_by_business(
        &self,
        business_id: &str,
        location_id: Option<&str>,
        options: &BusinessContactsQuery,
    ) -> Result<Vec<Contact>, CrmError> {
        let request = ApiRequest::get("/contacts/business")
            .segment(business_id)
            .query("locationId", self.location(location_id))
            .query_opt("limit", options.limit)
            .query_opt("skip", options.skip)
            .query_opt("query", non_empty(options.query.as_deref()));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("contacts", "failed to fetch contacts by businessId")
    }

    pub async fn add_tags(&self, contact_id: &str, tags: &[String]) -> Result<Vec<String>, CrmError> {
        if tags.is_empty() {
            return Err(CrmError::required("tags"));
        }
        let request = ApiRequest::post("/contacts/")
            .segment(contact_id)
            .segment("tags")
            .json(json!({ "tags": tags }));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("tags", "failed to add tags")
    }

    pub async fn remove_tags(&self, contact_id: &str, tags: &[String]) -> Result<Vec<String>, CrmError> {
        if tags.is_empty() {
            return Err(CrmError::required("tags"));
        }
        let request = ApiRequest::delete("/contacts/")
            .segment(contact_id)
            .segment("tags")
            .json(json!({ "tags": tags }));
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("tags", "failed to remove tags")
    }
}
