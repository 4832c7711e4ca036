//! HTTP middleware for the FHIR HTTP adapter.
//!
//! The pipeline stages, in the order [`Pipeline::standard`](crate::pipeline::Pipeline::standard)
//! applies them:
//!
//! - [`base_address`] - Base address for Content-Location
//! - [`content_type`] - Content negotiation
//! - [`encoder`] - Payload serialization
//! - [`errors`] - Framework errors to OperationOutcome
//! - [`body`] - Request body capture
//!
//! [`conditional`] reads the conditional request headers (If-Match, etc.).

pub mod base_address;
pub mod body;
pub mod conditional;
pub mod content_type;
pub mod encoder;
pub mod errors;

pub use conditional::{ConditionalHeaders, ConditionalRequestExt};
pub use content_type::{FhirContentType, FhirFormat, NegotiatedFormat};
