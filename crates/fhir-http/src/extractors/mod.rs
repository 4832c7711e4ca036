//! Axum extractors for FHIR-specific data.
//!
//! - [`QueryParams`] - Typed query parameter reader (`_summary`, dates, integers, booleans)
//! - [`FhirRequest`] - The inbound request as seen by an interaction handler

mod fhir_request;
pub mod query;

pub use fhir_request::FhirRequest;
pub use query::{QueryParams, QueryParamsExt};
