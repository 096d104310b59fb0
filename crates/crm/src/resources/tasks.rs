use leadgate_core::domain::task::Task;
use serde_json::Value;

use super::delete_outcome;
use crate::client::{ApiRequest, UpstreamClient};
use crate::error::CrmError;

pub struct Tasks<'a> {
    client: &'a UpstreamClient,
}

impl<'a> Tasks<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Task>, CrmError> {
        let envelope = self.client.execute(&ApiRequest::get("/tasks")).await?;
        envelope.decode_list("tasks", "failed to fetch tasks")
    }

    pub async fn get(&self, task_id: &str) -> Result<Task, CrmError> {
        let request = ApiRequest::get("/tasks").segment(task_id);
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("task", "failed to fetch task")
    }

    pub async fn create(&self, data: &Value) -> Result<Task, CrmError> {
        let request = ApiRequest::post("/tasks").json(data.clone());
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("task", "failed to create task")
    }

    pub async fn update(&self, task_id: &str, data: &Value) -> Result<Task, CrmError> {
        let request = ApiRequest::put("/tasks").segment(task_id).json(data.clone());
        let envelope = self.client.execute(&request).await?;
        envelope.decode_entity("task", "failed to update task")
    }

    pub async fn delete(&self, task_id: &str) -> Result<bool, CrmError> {
        delete_outcome(self.client, &ApiRequest::delete("/tasks").segment(task_id)).await
    }
}
