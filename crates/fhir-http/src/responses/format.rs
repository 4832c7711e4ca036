//! Format-aware payload rendering.
//!
//! Handlers and the assembler never serialize resources. They attach the
//! payload to the response as a [`PendingPayload`] and the encoder stage
//! renders it in the negotiated format:
//!
//! - JSON - `application/fhir+json`
//! - Binary - the raw content with its own media type, unless the client
//!   explicitly asked for a FHIR format
//! - XML - not available; reported as 406 Not Acceptable

use axum::body::Bytes;
use axum::http::HeaderValue;

use crate::error::RestError;
use crate::fhir_types::{Binary, Resource};
use crate::middleware::content_type::{FhirContentType, FhirFormat};

/// A resource waiting to be serialized by the encoder stage.
#[derive(Debug, Clone)]
pub struct PendingPayload(pub Resource);

/// A serialized payload and its media type.
#[derive(Debug, Clone)]
pub struct RenderedPayload {
    /// Value of the Content-Type header.
    pub content_type: HeaderValue,
    /// The body bytes.
    pub body: Bytes,
}

/// Serializes a resource for the negotiated format.
pub fn render_resource(
    resource: &Resource,
    negotiated: &FhirContentType,
) -> Result<RenderedPayload, RestError> {
    if resource.is_binary() && !negotiated.requested {
        if let Some(binary) = Binary::from_resource(resource) {
            return render_binary(&binary);
        }
    }

    match negotiated.format {
        FhirFormat::Json => {
            let body = serde_json::to_vec(resource.as_value()).map_err(|e| {
                RestError::InternalError {
                    message: format!("Failed to serialize to JSON: {}", e),
                }
            })?;
            Ok(RenderedPayload {
                content_type: HeaderValue::from_static("application/fhir+json; charset=utf-8"),
                body: Bytes::from(body),
            })
        }
        FhirFormat::Xml => Err(RestError::NotAcceptable {
            message: "XML format is not supported".to_string(),
        }),
    }
}

/// Passes Binary content through in its native media type.
fn render_binary(binary: &Binary) -> Result<RenderedPayload, RestError> {
    let content_type =
        HeaderValue::from_str(binary.content_type()).map_err(|_| RestError::InternalError {
            message: format!("Invalid Binary content type '{}'", binary.content_type()),
        })?;
    Ok(RenderedPayload {
        content_type,
        body: binary.content().clone(),
    })
}
