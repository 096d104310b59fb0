use leadgate_core::errors::{ApplicationError, FieldError};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidUrl(_) => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    OperationFailed(String),
    #[error("invalid request: {}", join_fields(.0))]
    Validation(Vec<FieldError>),
}

impl CrmError {
    pub fn required(field: &str) -> Self {
        Self::Validation(vec![FieldError::required(field)])
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields.iter().map(|field| field.message.as_str()).collect::<Vec<_>>().join("; ")
}

impl From<CrmError> for ApplicationError {
    fn from(value: CrmError) -> Self {
        match value {
            CrmError::Upstream(error) => {
                ApplicationError::Upstream { status: error.status(), message: error.to_string() }
            }
            CrmError::MalformedResponse(message) => ApplicationError::MalformedResponse(message),
            CrmError::OperationFailed(message) => ApplicationError::OperationFailed(message),
            CrmError::Validation(fields) => ApplicationError::validation(fields),
        }
    }
}

#[cfg(test)]
mod tests {
    use leadgate_core::errors::ApplicationError;

    use super::{CrmError, UpstreamError};

    #[test]
    fn terminal_status_is_carried_into_application_error() {
        let error: ApplicationError =
            CrmError::from(UpstreamError::Status { status: 422, body: "bad email".to_owned() })
                .into();

        assert!(matches!(error, ApplicationError::Upstream { status: Some(422), .. }));
    }

    #[test]
    fn transport_failure_has_no_status() {
        let error: ApplicationError =
            CrmError::from(UpstreamError::Transport("connection refused".to_owned())).into();

        assert!(matches!(error, ApplicationError::Upstream { status: None, .. }));
    }

    #[test]
    fn validation_message_lists_missing_fields() {
        assert_eq!(CrmError::required("locationId").to_string(), "invalid request: locationId is required");
    }
}
