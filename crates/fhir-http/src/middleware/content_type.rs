//! Content negotiation middleware.
//!
//! Determines the response format of every request and checks the media
//! type of request bodies that are actually present. The negotiated format is stored in the request
//! extensions as [`NegotiatedFormat`] for the encoder stage.

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mime::Mime;
use tracing::debug;

use crate::error::RestError;
use crate::extractors::QueryParams;

/// MIME type of FHIR JSON.
pub const FHIR_JSON: &str = "application/fhir+json";

/// MIME type of FHIR XML.
pub const FHIR_XML: &str = "application/fhir+xml";

/// Query parameter that overrides the Accept header.
pub const FORMAT_PARAM: &str = "_format";

/// Supported FHIR formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FhirFormat {
    /// JSON format (application/fhir+json)
    #[default]
    Json,
    /// XML format (application/fhir+xml)
    Xml,
}

impl FhirFormat {
    /// Returns the MIME type string for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            FhirFormat::Json => FHIR_JSON,
            FhirFormat::Xml => FHIR_XML,
        }
    }

    /// Parses a media type string into a FhirFormat.
    ///
    /// Accepts the FHIR types and their generic `json`/`xml` counterparts;
    /// media type parameters are ignored.
    pub fn parse(media_type: &str) -> Option<Self> {
        let media_type: Mime = media_type.trim().parse().ok()?;
        Self::from_mime(&media_type)
    }

    /// Maps a parsed media type into a FhirFormat.
    pub fn from_mime(media_type: &Mime) -> Option<Self> {
        let subtype = media_type.subtype();
        let suffix = media_type.suffix();

        if media_type.type_() == mime::APPLICATION {
            if (subtype == "fhir" && suffix.is_some_and(|s| s == mime::JSON)) || subtype == mime::JSON
            {
                return Some(FhirFormat::Json);
            }
            if (subtype == "fhir" && suffix.is_some_and(|s| s == mime::XML)) || subtype == mime::XML {
                return Some(FhirFormat::Xml);
            }
        }
        if media_type.type_() == mime::TEXT && subtype == mime::XML {
            return Some(FhirFormat::Xml);
        }
        None
    }

    /// Parses a `_format` value (`json`, `xml` or a media type).
    pub fn from_format_param(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(FhirFormat::Json),
            "xml" => Some(FhirFormat::Xml),
            other => Self::parse(other),
        }
    }
}

/// Outcome of content negotiation for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FhirContentType {
    /// The response format.
    pub format: FhirFormat,
    /// True when the client asked for a FHIR format explicitly, through
    /// `_format` or a FHIR media type in Accept.
    pub requested: bool,
}

impl FhirContentType {
    /// A format the client asked for.
    pub fn requested(format: FhirFormat) -> Self {
        Self {
            format,
            requested: true,
        }
    }

    /// A format chosen by the server.
    pub fn fallback(format: FhirFormat) -> Self {
        Self {
            format,
            requested: false,
        }
    }

    /// Returns the MIME type string for this content type.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// The negotiated response format, stored in the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NegotiatedFormat(pub FhirContentType);

/// Determines the response format from `_format` and the Accept header.
///
/// Precedence: `_format` > Accept > `default`. Wildcards and unknown media
/// types fall back to `default`. Quality values are not weighed; the first
/// recognized media type wins.
pub fn negotiate_format(
    headers: &HeaderMap,
    format_param: Option<&str>,
    default: FhirFormat,
) -> FhirContentType {
    if let Some(format) = format_param.and_then(FhirFormat::from_format_param) {
        return FhirContentType::requested(format);
    }

    let accept = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','));

    for media_type in accept {
        if let Some(format) = FhirFormat::parse(media_type) {
            return FhirContentType::requested(format);
        }
    }

    FhirContentType::fallback(default)
}

/// Validates the Content-Type of a request body.
///
/// Requests without a Content-Type pass. FHIR formats pass. A form-encoded
/// body passes for `_search`, and any media type passes for `Binary`, whose
/// content is kept in its native format.
pub fn validate_request_content_type(
    headers: &HeaderMap,
    path: &str,
) -> Result<Option<FhirFormat>, RestError> {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return Ok(None);
    };

    let unsupported = || RestError::UnsupportedMediaType {
        content_type: content_type.to_string(),
    };
    let media_type: Mime = content_type.parse().map_err(|_| unsupported())?;

    if let Some(format) = FhirFormat::from_mime(&media_type) {
        return Ok(Some(format));
    }
    if media_type.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
        && path.ends_with("/_search")
    {
        return Ok(None);
    }
    if targets_binary(path) {
        return Ok(None);
    }
    Err(unsupported())
}

fn targets_binary(path: &str) -> bool {
    path.trim_start_matches('/').split('/').next() == Some("Binary")
}

/// Returns true unless the request body is known to be empty.
pub fn has_body(request: &Request) -> bool {
    request.body().size_hint().upper() != Some(0)
}

/// Resolves the response format, rejecting formats the encoder cannot
/// produce.
///
/// An explicitly requested XML format is refused with 406. An XML server
/// default falls back to JSON.
pub fn acceptable_format(negotiated: FhirContentType) -> Result<FhirContentType, RestError> {
    match negotiated.format {
        FhirFormat::Json => Ok(negotiated),
        FhirFormat::Xml if negotiated.requested => Err(RestError::NotAcceptable {
            message: "XML format is not supported".to_string(),
        }),
        FhirFormat::Xml => Ok(FhirContentType::fallback(FhirFormat::Json)),
    }
}

/// Middleware negotiating the response format of every request.
///
/// Rejects unsupported request bodies with 415 and unavailable response
/// formats with 406 before the request reaches a handler.
pub async fn negotiate_content(
    State(default): State<FhirFormat>,
    mut request: Request,
    next: Next,
) -> Response {
    if has_body(&request) {
        if let Err(err) = validate_request_content_type(request.headers(), request.uri().path()) {
            debug!(error = %err, "Rejecting request body");
            return err.into_response();
        }
    }

    let query = QueryParams::from_uri(request.uri());
    let negotiated = match acceptable_format(negotiate_format(
        request.headers(),
        query.get(FORMAT_PARAM),
        default,
    )) {
        Ok(negotiated) => negotiated,
        Err(err) => {
            debug!(error = %err, "Rejecting response format");
            return err.into_response();
        }
    };
    debug!(
        format = negotiated.mime_type(),
        requested = negotiated.requested,
        "Negotiated response format"
    );

    request
        .extensions_mut()
        .insert(NegotiatedFormat(negotiated));
    next.run(request).await
}
