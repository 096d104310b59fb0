use serde::Serialize;
use serde_json::Value;

use super::to_body;
use crate::client::{ApiRequest, UpstreamClient};
use crate::error::CrmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MessageChannel {
    #[serde(rename = "SMS")]
    Sms,
    #[serde(rename = "Email")]
    Email,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub channel: MessageChannel,
    pub contact_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl OutboundMessage {
    pub fn sms(contact_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            channel: MessageChannel::Sms,
            contact_id: contact_id.into(),
            message: message.into(),
            subject: None,
        }
    }

    pub fn email(
        contact_id: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            channel: MessageChannel::Email,
            contact_id: contact_id.into(),
            message: message.into(),
            subject: Some(subject.into()),
        }
    }
}

pub struct Conversations<'a> {
    client: &'a UpstreamClient,
}

impl<'a> Conversations<'a> {
    pub(crate) fn new(client: &'a UpstreamClient) -> Self {
        Self { client }
    }

    /// Returns the upstream receipt (`messageId`, `conversationId`, ...).
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<Value, CrmError> {
        if message.contact_id.trim().is_empty() {
            return Err(CrmError::required("contactId"));
        }
        if message.message.trim().is_empty() {
            return Err(CrmError::required("message"));
        }
        let request = ApiRequest::post("/conversations/messages").json(to_body(message)?);
        let envelope = self.client.execute(&request).await?;
        if envelope.status() == Some("error") {
            return Err(envelope.failure("failed to send message"));
        }
        Ok(envelope.into_value())
    }
}
