use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }

    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        let message = format!("{field} is required");
        Self { field, message }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("validation failed: {message}")]
    Validation { message: String, fields: Vec<FieldError> },
    #[error("{message}")]
    ClientResolution { message: String, available_clients: Vec<String> },
    #[error("upstream failure: {message}")]
    Upstream { status: Option<u16>, message: String },
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Internal { .. } => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. } | Self::Internal { message, .. } => message,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. } | Self::Internal { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

impl ApplicationError {
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let message = fields
            .iter()
            .map(|field| field.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation { message, fields }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let message = value.to_string();
        match value {
            ApplicationError::Validation { .. }
            | ApplicationError::ClientResolution { .. }
            | ApplicationError::Upstream { status: Some(_), .. } => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Upstream { status: None, .. }
            | ApplicationError::MalformedResponse(_)
            | ApplicationError::OperationFailed(_)
            | ApplicationError::Configuration(_) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, FieldError, InterfaceError};

    #[test]
    fn validation_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::validation(vec![FieldError::required("action")])
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.status_code(), 400);
    }

    #[test]
    fn validation_message_joins_field_messages() {
        let error = ApplicationError::validation(vec![
            FieldError::required("locationId"),
            FieldError::new("email", "email must contain @"),
        ]);

        assert_eq!(
            error.to_string(),
            "validation failed: locationId is required; email must contain @"
        );
    }

    #[test]
    fn client_resolution_error_keeps_its_message_verbatim() {
        let error = ApplicationError::ClientResolution {
            message: "No valid client found".to_owned(),
            available_clients: vec!["client_a".to_owned()],
        };
        let interface = error.into_interface("req-2");

        assert_eq!(interface.message(), "No valid client found");
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn upstream_error_status_decides_between_400_and_500() {
        let with_status = ApplicationError::Upstream {
            status: Some(404),
            message: "contact not found".to_owned(),
        }
        .into_interface("req-3");
        assert_eq!(with_status.status_code(), 400);

        let without_status = ApplicationError::Upstream {
            status: None,
            message: "connection reset".to_owned(),
        }
        .into_interface("req-4");
        assert_eq!(without_status.status_code(), 500);
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing base url".to_owned()).into_interface("req-5");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.correlation_id(), "req-5");
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn malformed_response_maps_to_internal() {
        let interface = ApplicationError::MalformedResponse("expected value at line 1".to_owned())
            .into_interface("req-6");

        assert_eq!(interface.status_code(), 500);
    }
}
