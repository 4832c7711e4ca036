//! Response assembly.
//!
//! Turns an interaction result into the outbound response. A result with a
//! payload becomes a response at the result's status carrying the payload for
//! the encoder stage; a result without one becomes a status-only response.
//! The versioning headers are composed in both cases.

use axum::body::Body;
use axum::response::Response;
use tracing::debug;

use crate::context::{RequestContextExt, RequestParts, ResolvedInteraction};
use crate::responses::format::PendingPayload;
use crate::responses::headers::acquire_headers;
use crate::responses::FhirResponse;

/// Builds the response for an interaction result.
///
/// The resolved interaction of the request, if any, is copied into the
/// response extensions so the encoder stage can see it.
pub fn build_response<R>(request: &R, fhir: FhirResponse) -> Response
where
    R: RequestParts + ?Sized,
{
    let mut response = Response::new(Body::empty());
    *response.status_mut() = fhir.status();
    acquire_headers(&mut response, &fhir, request.base_address());

    if let Some(entry) = request.get_entry() {
        response
            .extensions_mut()
            .insert(ResolvedInteraction(entry.clone()));
    }

    let (status, resource, key) = fhir.into_parts();
    debug!(
        status = status.as_u16(),
        has_payload = resource.is_some(),
        key = ?key.as_ref().map(|k| k.to_relative_path()),
        "Assembled FHIR response"
    );

    if let Some(resource) = resource {
        response.extensions_mut().insert(PendingPayload(resource));
    }

    response
}
