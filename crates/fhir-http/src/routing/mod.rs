//! Route configuration for the FHIR HTTP adapter.
//!
//! This module contains the routing configuration that maps FHIR URL
//! patterns to the interaction endpoint.

pub mod fhir_routes;

pub use fhir_routes::{create_routes, fhir_endpoint};
