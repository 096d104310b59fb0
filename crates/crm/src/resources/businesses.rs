use leadgate_core::domain::business::{Business, BusinessInput};
use leadgate_core::errors::FieldError;

use super::{delete_outcome, non_empty, to_body};
use crate::client::{ApiRequest, UpstreamClient};
use crate::error::CrmError;

pub struct Businesses<'a> {
    client: &'a UpstreamClient,
}

impl<'a> Businesses<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, input: &BusinessInput) -> Result<Business, CrmError> {
        let mut missing = Vec::new();
        if non_empty(input.name.as_deref()).is_none() {
            missing.push(FieldError::required("name"));
        }
        if non_empty(input.location_id.as_deref()).is_none() {
            missing.push(FieldError::required("locationId"));
        }
        if !missing.is_empty() {
            return Err(CrmError::Validation(missing));
        }

        let request = ApiRequest::post("/businesses/").json(to_body(input)?);
        let envelope = self.client.execute(&request).await?;
        if envelope.flag("success") == Some(false) {
            return Err(envelope.failure("failed to create business"));
        }
        envelope.decode_entity("business", "failed to create business")
    }

    pub async fn get_by_id(&self, business_id: &str) -> Result<Business, CrmError> {
        let request = ApiRequest::get("/businesses/").segment(business_id);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("business", "failed to fetch business by id")
    }

    pub async fn list_by_location(&self, location_id: Option<&str>) -> Result<Vec<Business>, CrmError> {
        let location = non_empty(location_id).unwrap_or(self.client.location_id());
        let request = ApiRequest::get("/businesses/").query("locationId", location);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("businesses", "failed to fetch businesses by location")
    }

    pub async fn update(&self, business_id: &str, input: &BusinessInput) -> Result<Business, CrmError> {
        let request = ApiRequest::put("/businesses/").segment(business_id).json(to_body(input)?);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("business", "failed to update business")
    }

    pub async fn delete(&self, business_id: &str) -> Result<bool, CrmError> {
        let request = ApiRequest::delete("/businesses/").segment(business_id);
        delete_outcome(self.client, &request).await
    }
}
