//! Request-scoped context.
//!
//! Pipeline stages that run at different points of a request (the body
//! capture stage, the interaction endpoint, the response encoder) share
//! information through typed slots stored in the request's
//! [`Extensions`]. Each slot holds at most one value; writing it again
//! replaces the previous value.
//!
//! | Slot | Written by | Read by |
//! |------|------------|---------|
//! | [`UnparsedBody`] | body capture stage | interaction handlers |
//! | [`ResolvedInteraction`] | interaction endpoint | response assembly, encoders |
//! | [`BaseAddress`] | base address stage | response header composer |
//! | [`NegotiatedFormat`] | content negotiation stage | encoder stage |
//!
//! [`NegotiatedFormat`]: crate::middleware::NegotiatedFormat
//!
//! The slots live and die with the request, so nothing leaks between
//! concurrent requests.

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method, Uri, request::Parts};
use url::Url;

use crate::fhir_types::Binary;
use crate::interaction::Interaction;

/// The raw request body as it arrived on the wire.
#[derive(Debug, Clone)]
pub struct UnparsedBody(pub Binary);

/// The interaction the request resolved to.
#[derive(Debug, Clone)]
pub struct ResolvedInteraction(pub Interaction);

/// The server base address used to build absolute resource URIs.
#[derive(Debug, Clone)]
pub struct BaseAddress(pub Url);

/// Access to the parts of an inbound request the adapter reads.
///
/// Implemented for full requests and for request [`Parts`], so the accessors
/// in this crate work both in middleware and after a request was split.
pub trait RequestParts {
    /// Returns the request method.
    fn method(&self) -> &Method;

    /// Returns the request URI.
    fn uri(&self) -> &Uri;

    /// Returns the request headers.
    fn headers(&self) -> &HeaderMap;

    /// Returns the request extensions.
    fn extensions(&self) -> &Extensions;

    /// Returns the request extensions mutably.
    fn extensions_mut(&mut self) -> &mut Extensions;
}

impl<B> RequestParts for axum::http::Request<B> {
    fn method(&self) -> &Method {
        axum::http::Request::method(self)
    }

    fn uri(&self) -> &Uri {
        axum::http::Request::uri(self)
    }

    fn headers(&self) -> &HeaderMap {
        axum::http::Request::headers(self)
    }

    fn extensions(&self) -> &Extensions {
        axum::http::Request::extensions(self)
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        axum::http::Request::extensions_mut(self)
    }
}

impl RequestParts for Parts {
    fn method(&self) -> &Method {
        &self.method
    }

    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Reads and writes the request-scoped context slots.
pub trait RequestContextExt: RequestParts {
    /// Stores the raw request body with its declared content type.
    fn save_body(&mut self, content_type: &str, data: Bytes) {
        self.extensions_mut()
            .insert(UnparsedBody(Binary::new(content_type, data)));
    }

    /// Returns the raw request body, if one was captured.
    fn get_body(&self) -> Option<&Binary> {
        self.extensions().get::<UnparsedBody>().map(|b| &b.0)
    }

    /// Stores the interaction this request resolved to.
    fn save_entry(&mut self, interaction: Interaction) {
        self.extensions_mut()
            .insert(ResolvedInteraction(interaction));
    }

    /// Returns the interaction this request resolved to.
    fn get_entry(&self) -> Option<&Interaction> {
        self.extensions().get::<ResolvedInteraction>().map(|i| &i.0)
    }

    /// Returns the base address configured for this request.
    fn base_address(&self) -> Option<&Url> {
        self.extensions().get::<BaseAddress>().map(|b| &b.0)
    }
}

impl<T: RequestParts + ?Sized> RequestContextExt for T {}
