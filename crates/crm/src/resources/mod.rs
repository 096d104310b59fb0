//! Typed wrappers over the upstream REST resources. Each operation is one
//! HTTP call through the retry executor followed by envelope unwrapping.

mod associations;
mod businesses;
mod contacts;
mod conversations;
mod objects;
mod organizations;
mod tasks;

pub use associations::{Associations, DEFAULT_PAGE_LIMIT};
pub use businesses::Businesses;
pub use contacts::Contacts;
pub use conversations::{Conversations, MessageChannel, OutboundMessage};
pub use objects::CustomObjects;
pub use organizations::Organizations;
pub use tasks::Tasks;

use leadgate_core::retry::is_retryable_status;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::client::{ApiRequest, UpstreamClient};
use crate::envelope::Envelope;
use crate::error::{CrmError, UpstreamError};

pub(crate) fn to_body<T: Serialize>(value: &T) -> Result<Value, CrmError> {
    serde_json::to_value(value)
        .map_err(|error| CrmError::OperationFailed(format!("could not encode request body: {error}")))
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// A delete either reports an outcome or the upstream refused it; a
/// terminal refusal reads as "not deleted" rather than an error.
pub(crate) async fn delete_outcome(
    client: &UpstreamClient,
    request: &ApiRequest,
) -> Result<bool, CrmError> {
    delete_with(client, request, Envelope::delete_outcome).await
}

pub(crate) async fn delete_with(
    client: &UpstreamClient,
    request: &ApiRequest,
    interpret: impl FnOnce(&Envelope) -> bool,
) -> Result<bool, CrmError> {
    match client.execute(request).await {
        Ok(envelope) => Ok(interpret(&envelope)),
        Err(UpstreamError::Status { status, body }) if !is_retryable_status(status) => {
            warn!(
                event_name = "upstream.delete.rejected",
                client_id = %client.client_id(),
                request = %request,
                status,
                body = %body,
                "upstream rejected delete"
            );
            Ok(false)
        }
        Err(error) => Err(error.into()),
    }
}
