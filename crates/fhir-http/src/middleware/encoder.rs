//! Payload encoder stage.
//!
//! Serializes the [`PendingPayload`] of a response in the format negotiated
//! for the request. Responses without a pending payload pass through
//! untouched.

use axum::{
    body::Body,
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::context::ResolvedInteraction;
use crate::middleware::content_type::{FhirContentType, FhirFormat, NegotiatedFormat};
use crate::responses::format::{PendingPayload, render_resource};

/// Middleware encoding pending payloads.
pub async fn encode_payload(request: Request, next: Next) -> Response {
    let negotiated = request
        .extensions()
        .get::<NegotiatedFormat>()
        .copied()
        .unwrap_or_default()
        .0;

    let response = next.run(request).await;
    encode_response(response, &negotiated)
}

/// Serializes the pending payload of a response, if any.
///
/// A payload that cannot be rendered in the negotiated format is rendered as
/// JSON instead. The status and headers set by response assembly are kept
/// either way, since the interaction has already taken effect.
pub fn encode_response(mut response: Response, negotiated: &FhirContentType) -> Response {
    let Some(PendingPayload(resource)) = response.extensions_mut().remove::<PendingPayload>()
    else {
        return response;
    };

    let rendered = match render_resource(&resource, negotiated) {
        Ok(rendered) => rendered,
        Err(err) => {
            warn!(error = %err, "Cannot encode payload in negotiated format, using JSON");
            match render_resource(&resource, &FhirContentType::fallback(FhirFormat::Json)) {
                Ok(rendered) => rendered,
                Err(err) => {
                    warn!(error = %err, "Failed to encode response payload");
                    let mut fallback = err.into_response();
                    fallback.extensions_mut().remove::<PendingPayload>();
                    return fallback;
                }
            }
        }
    };

    let interaction = response
        .extensions()
        .get::<ResolvedInteraction>()
        .map(|entry| entry.0.kind().as_str());
    debug!(
        content_type = ?rendered.content_type,
        length = rendered.body.len(),
        interaction = interaction.unwrap_or("none"),
        "Encoded response payload"
    );

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, rendered.content_type);
    Response::from_parts(parts, Body::from(rendered.body))
}
