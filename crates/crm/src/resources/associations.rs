use leadgate_core::domain::association::{Association, Relation, RelationQuery};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{delete_outcome, delete_with, non_empty};
use crate::client::{ApiRequest, UpstreamClient};
use crate::envelope::Envelope;
use crate::error::CrmError;

pub const DEFAULT_PAGE_LIMIT: u32 = 100;

pub struct Associations<'a> {
    client: &'a UpstreamClient,
}

fn decode_record<T: DeserializeOwned>(envelope: &Envelope, context: &str) -> Result<T, CrmError> {
    let record = envelope.record().ok_or_else(|| envelope.failure(context))?;
    serde_json::from_value(record)
        .map_err(|error| CrmError::OperationFailed(format!("{context}: unexpected shape ({error})")))
}

impl<'a> Associations<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    fn location<'b>(&'b self, location_id: Option<&'b str>) -> &'b str {
        non_empty(location_id).unwrap_or(self.client.location_id())
    }

    pub async fn create_association(&self, data: &Value) -> Result<Association, CrmError> {
        let request = ApiRequest::post("/associations/").json(data.clone());
        let envelope = self.client.execute(&request).await?;
        decode_record(&envelope, "failed to create association")
    }

    pub async fn list_associations(
        &self,
        location_id: Option<&str>,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Association>, CrmError> {
        let request = ApiRequest::get("/associations/")
            .query("locationId", self.location(location_id))
            .query("skip", skip)
            .query("limit", limit);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("associations", "failed to list associations")
    }

    pub async fn get_association(&self, association_id: &str) -> Result<Association, CrmError> {
        let request = ApiRequest::get("/associations/").segment(association_id);
        let envelope = self.client.execute(&request).await?;
        decode_record(&envelope, "failed to fetch association by id")
    }

    pub async fn update_association(
        &self,
        association_id: &str,
        data: &Value,
    ) -> Result<Association, CrmError> {
        let request = ApiRequest::put("/associations/").segment(association_id).json(data.clone());
        let envelope = self.client.execute(&request).await?;
        decode_record(&envelope, "failed to update association")
    }

    pub async fn delete_association(&self, association_id: &str) -> Result<bool, CrmError> {
        let request = ApiRequest::delete("/associations/").segment(association_id);
        delete_outcome(self.client, &request).await
    }

    pub async fn create_relation(&self, data: &Value) -> Result<Relation, CrmError> {
        let request = ApiRequest::post("/associations/relations").json(data.clone());
        let envelope = self.client.execute(&request).await?;
        decode_record(&envelope, "failed to create relation")
    }

    pub async fn list_relations(
        &self,
        record_id: &str,
        location_id: Option<&str>,
        query: &RelationQuery,
    ) -> Result<Vec<Relation>, CrmError> {
        let limit = if query.limit == 0 { DEFAULT_PAGE_LIMIT } else { query.limit };
        let mut request = ApiRequest::get("/associations/relations")
            .segment(record_id)
            .query("locationId", self.location(location_id))
            .query("skip", query.skip)
            .query("limit", limit);
        for association_id in &query.association_ids {
            request = request.query("associationIds", association_id);
        }
        let envelope = self.client.execute(&request).await?;
        envelope.decode_list("relations", "failed to fetch relations by recordId")
    }

    pub async fn delete_relation(
        &self,
        relation_id: &str,
        location_id: Option<&str>,
    ) -> Result<bool, CrmError> {
        let request = ApiRequest::delete("/associations/relations")
            .segment(relation_id)
            .query("locationId", self.location(location_id));
        // Relation deletes echo the removed relation instead of a flag.
        delete_with(self.client, &request, |envelope| {
            envelope.record().is_some() || envelope.delete_outcome()
        })
        .await
    }
}
