//! The inbound request as seen by an interaction handler.

use axum::{
    extract::FromRequestParts,
    http::{Extensions, HeaderMap, Method, Uri, header, request::Parts},
};
use tracing::debug;

use crate::context::{RequestContextExt, RequestParts};
use crate::error::{RestError, RestResult};
use crate::extractors::QueryParams;
use crate::fhir_types::{Binary, Resource};
use crate::interaction::{Interaction, InteractionKind};
use crate::middleware::conditional::ConditionalHeaders;
use crate::middleware::content_type::{FhirContentType, FhirFormat, NegotiatedFormat};

/// A request resolved to a FHIR interaction.
///
/// Extracting a `FhirRequest` resolves the interaction from the method and
/// path and records it in the request context. All request accessors of the
/// crate ([`RequestContextExt`], [`ConditionalRequestExt`],
/// [`QueryParamsExt`]) are available on it.
///
/// [`ConditionalRequestExt`]: crate::middleware::ConditionalRequestExt
/// [`QueryParamsExt`]: crate::extractors::QueryParamsExt
#[derive(Debug, Clone)]
pub struct FhirRequest {
    parts: Parts,
    interaction: Interaction,
}

impl FhirRequest {
    /// Creates a request for an already resolved interaction.
    pub fn new(mut parts: Parts, interaction: Interaction) -> Self {
        parts.save_entry(interaction.clone());
        Self { parts, interaction }
    }

    /// Resolves the interaction of the request.
    ///
    /// Fails with 405 when the path names interactions for other methods
    /// only, and with 404 when it names none.
    pub fn resolve(parts: Parts) -> RestResult<Self> {
        let path = parts.uri.path();
        let Some(interaction) = Interaction::resolve(&parts.method, path) else {
            if Interaction::allowed_methods(path).is_empty() {
                return Err(RestError::RouteNotFound {
                    path: path.to_string(),
                });
            }
            return Err(RestError::MethodNotAllowed {
                method: parts.method.to_string(),
                path: path.to_string(),
            });
        };
        Ok(Self::new(parts, interaction))
    }

    /// Returns the resolved interaction.
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Returns the interaction kind.
    pub fn kind(&self) -> InteractionKind {
        self.interaction.kind()
    }

    /// Returns the request parts.
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Returns the raw request body, if the request had one.
    pub fn binary(&self) -> Option<&Binary> {
        self.get_body()
    }

    /// Parses the request body into a resource.
    ///
    /// JSON bodies are parsed as FHIR JSON; a body without a Content-Type is
    /// taken to be JSON. `Binary` targets accept any other media type and
    /// receive the content wrapped in a Binary resource.
    pub fn resource(&self) -> RestResult<Option<Resource>> {
        let Some(body) = self.get_body() else {
            return Ok(None);
        };

        let is_binary = self.interaction.target_type() == Some("Binary");
        let format = if self.parts.headers.contains_key(header::CONTENT_TYPE) {
            FhirFormat::parse(body.content_type())
        } else if is_binary {
            None
        } else {
            Some(FhirFormat::Json)
        };

        match format {
            Some(FhirFormat::Json) => {
                let resource: Resource = serde_json::from_slice(body.content())?;
                if resource.resource_type().is_none() {
                    return Err(RestError::BadRequest {
                        message: "Resource has no resourceType".to_string(),
                    });
                }
                debug!(
                    resource_type = resource.resource_type().unwrap_or_default(),
                    "Parsed request resource"
                );
                Ok(Some(resource))
            }
            None if is_binary => Ok(Some(body.to_resource())),
            _ => Err(RestError::UnsupportedMediaType {
                content_type: body.content_type().to_string(),
            }),
        }
    }

    /// Returns the conditional request headers.
    pub fn conditional(&self) -> ConditionalHeaders {
        ConditionalHeaders::from_headers(&self.parts.headers)
    }

    /// Returns the decoded query parameters.
    pub fn query(&self) -> QueryParams {
        QueryParams::from_uri(&self.parts.uri)
    }

    /// Returns the negotiated response format.
    pub fn format(&self) -> FhirContentType {
        self.parts
            .extensions
            .get::<NegotiatedFormat>()
            .map(|n| n.0)
            .unwrap_or_default()
    }
}

impl RequestParts for FhirRequest {
    fn method(&self) -> &Method {
        &self.parts.method
    }

    fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }
}

impl<S> FromRequestParts<S> for FhirRequest
where
    S: Send + Sync,
{
    type Rejection = RestError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request = FhirRequest::resolve(parts.clone())?;
        parts.save_entry(request.interaction.clone());
        Ok(request)
    }
}
