//! Upstream CRM access: authenticated client, response normalization,
//! retry, typed resource wrappers and the tenant registry.

pub mod client;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod resources;
pub mod retry;

pub use client::{ApiRequest, UpstreamClient, UpstreamFactory, UpstreamSettings};
pub use envelope::{Envelope, Located};
pub use error::{CrmError, UpstreamError};
pub use registry::{
    AddOutcome, ClientRegistry, RegisteredClient, RegistryError, RegistryOptions, ResolutionSource,
    ResolvedClient, RoutingHints,
};
pub use retry::{RecordingSleeper, RetryExecutor, Sleeper, TokioSleeper};
