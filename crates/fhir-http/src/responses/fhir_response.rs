//! The result of one FHIR interaction.

use axum::http::StatusCode;

use crate::error::RestError;
use crate::fhir_types::{Resource, ResourceKey};

/// Status, optional payload and optional key produced by an interaction
/// handler.
///
/// A response is built once by the handler and consumed once by
/// [`build_response`](crate::responses::build_response).
#[derive(Debug, Clone, PartialEq)]
pub struct FhirResponse {
    status: StatusCode,
    resource: Option<Resource>,
    key: Option<ResourceKey>,
}

impl FhirResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, resource: Option<Resource>, key: Option<ResourceKey>) -> Self {
        Self {
            status,
            resource,
            key,
        }
    }

    /// `200 OK` with the resource; the key is taken from the resource.
    pub fn ok(resource: Resource) -> Self {
        let key = resource.key();
        Self::new(StatusCode::OK, Some(resource), key)
    }

    /// `201 Created` with the resource; the key is taken from the resource.
    pub fn created(resource: Resource) -> Self {
        let key = resource.key();
        Self::new(StatusCode::CREATED, Some(resource), key)
    }

    /// `204 No Content` without payload or key.
    pub fn no_content() -> Self {
        Self::from_status(StatusCode::NO_CONTENT)
    }

    /// `304 Not Modified` for the given resource version.
    pub fn not_modified(key: ResourceKey) -> Self {
        Self::new(StatusCode::NOT_MODIFIED, None, Some(key))
    }

    /// `410 Gone` for a deleted resource.
    pub fn gone(key: ResourceKey) -> Self {
        Self::new(StatusCode::GONE, None, Some(key))
    }

    /// A bare status without payload or key.
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, None, None)
    }

    /// Replaces the key.
    pub fn with_key(mut self, key: ResourceKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the payload resource.
    pub fn resource(&self) -> Option<&Resource> {
        self.resource.as_ref()
    }

    /// Returns the resource key.
    pub fn key(&self) -> Option<&ResourceKey> {
        self.key.as_ref()
    }

    /// Splits the response into status, payload and key.
    pub fn into_parts(self) -> (StatusCode, Option<Resource>, Option<ResourceKey>) {
        (self.status, self.resource, self.key)
    }
}

/// An error becomes a response carrying its OperationOutcome.
impl From<RestError> for FhirResponse {
    fn from(err: RestError) -> Self {
        let outcome = err.to_operation_outcome();
        Self::new(err.status(), Some(outcome), None)
    }
}
