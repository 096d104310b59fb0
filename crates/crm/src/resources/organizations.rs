use leadgate_core::domain::organization::Organization;

use crate::client::{ApiRequest, UpstreamClient};
use crate::error::CrmError;

pub struct Organizations<'a> {
    client: &'a UpstreamClient,
}

impl<'a> Organizations<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Organization>, CrmError> {
        let envelope = self.client.execute(&ApiRequest::get("/organizations")).await?;
        envelope.decode_list("organizations", "failed to fetch organizations")
    }

    pub async fn get(&self, organization_id: &str) -> Result<Organization, CrmError> {
        let request = ApiRequest::get("/organizations").segment(organization_id);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("organization", "failed to fetch organization")
    }
}
