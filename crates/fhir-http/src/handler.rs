//! The interaction handler contract.
//!
//! The adapter resolves the interaction, prepares the request and assembles
//! the response; what an interaction actually does is up to an
//! [`InteractionHandler`] supplied by the application (typically backed by a
//! resource store).

use async_trait::async_trait;

use crate::error::RestResult;
use crate::extractors::FhirRequest;
use crate::responses::FhirResponse;

/// Produces the result of one FHIR interaction.
///
/// Errors are rendered as OperationOutcome responses with the status of the
/// [`RestError`](crate::RestError).
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use helios_fhir_http::{FhirRequest, FhirResponse, InteractionHandler, RestResult};
///
/// struct Metadata;
///
/// #[async_trait]
/// impl InteractionHandler for Metadata {
///     async fn handle(&self, _request: &FhirRequest) -> RestResult<FhirResponse> {
///         Ok(FhirResponse::no_content())
///     }
/// }
/// ```
#[async_trait]
pub trait InteractionHandler: Send + Sync + 'static {
    /// Handles a resolved FHIR interaction.
    async fn handle(&self, request: &FhirRequest) -> RestResult<FhirResponse>;
}
