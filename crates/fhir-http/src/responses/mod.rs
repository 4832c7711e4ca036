//! Response building for the FHIR HTTP adapter.
//!
//! - [`fhir_response`] - The result of an interaction
//! - [`assembler`] - Turns a result into an HTTP response
//! - [`headers`] - Versioning headers (ETag, Content-Location, Last-Modified)
//! - [`format`] - Payload rendering for the encoder stage
//! - [`operation_outcome`] - OperationOutcome generation

pub mod assembler;
pub mod fhir_response;
pub mod format;
pub mod headers;
pub mod operation_outcome;

pub use assembler::build_response;
pub use fhir_response::FhirResponse;
pub use format::PendingPayload;
pub use headers::{ResourceHeaders, acquire_headers};
pub use operation_outcome::OperationOutcomeBuilder;
