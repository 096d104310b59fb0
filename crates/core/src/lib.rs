pub mod config;
pub mod domain;
pub mod errors;
pub mod retry;

pub use config::{AppConfig, ClientEntry, ConfigError, LoadOptions, LogFormat};
pub use domain::client::{ClientConfig, ClientId, ClientSummary, SessionMapping};
pub use errors::{ApplicationError, FieldError, InterfaceError};
pub use retry::{is_retryable_status, RetryPolicy};
