//! Response header composition.
//!
//! Derives the versioning headers of a response from the interaction result:
//!
//! - `ETag` - the strong entity tag `"<versionId>"` of the result's key
//! - `Content-Location` - the key resolved against the base address
//! - `Last-Modified` - `meta.lastUpdated` of the payload resource
//!
//! A header whose source data is absent is not written. Applying the same
//! headers twice leaves the response unchanged.

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use tracing::warn;
use url::Url;

use crate::responses::FhirResponse;

/// Versioning headers for one interaction result.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceHeaders {
    /// ETag value (strong validator).
    etag: Option<String>,
    /// Content-Location URL.
    content_location: Option<String>,
    /// Last-Modified timestamp.
    last_modified: Option<String>,
}

impl ResourceHeaders {
    /// Creates an empty set of headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the headers from an interaction result.
    ///
    /// Without a base address, Content-Location is the relative path of the
    /// key. A key with an empty version id yields no ETag and an unversioned
    /// Content-Location.
    pub fn from_fhir_response(fhir: &FhirResponse, base: Option<&Url>) -> Self {
        let mut headers = Self::new();

        if let Some(key) = fhir.key() {
            if let Some(version_id) = key.version() {
                headers = headers.with_version(version_id);
            }
            headers = headers.with_content_location(match base {
                Some(base) => key.to_uri(base).to_string(),
                None => key.to_relative_path(),
            });
        }

        if let Some(last_updated) = fhir.resource().and_then(|r| r.last_updated()) {
            headers = headers.with_last_modified(http_date(&last_updated));
        }

        headers
    }

    /// Sets the ETag from a version ID.
    pub fn with_version(mut self, version_id: &str) -> Self {
        self.etag = Some(format!("\"{}\"", version_id));
        self
    }

    /// Sets the Content-Location URL.
    pub fn with_content_location(mut self, location: impl Into<String>) -> Self {
        self.content_location = Some(location.into());
        self
    }

    /// Sets the Last-Modified value.
    pub fn with_last_modified(mut self, timestamp: impl Into<String>) -> Self {
        self.last_modified = Some(timestamp.into());
        self
    }

    /// Writes the headers, replacing any existing values.
    pub fn apply(&self, headers: &mut HeaderMap) {
        let entries = [
            (header::ETAG, &self.etag),
            (header::CONTENT_LOCATION, &self.content_location),
            (header::LAST_MODIFIED, &self.last_modified),
        ];

        for (name, value) in entries {
            let Some(value) = value else { continue };
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(_) => warn!(header = %name, value = %value, "Skipping invalid header value"),
            }
        }
    }

    /// Converts to an Axum HeaderMap.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.apply(&mut headers);
        headers
    }

    /// Returns the ETag value.
    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    /// Returns the Content-Location value.
    pub fn content_location(&self) -> Option<&str> {
        self.content_location.as_deref()
    }

    /// Returns the Last-Modified value.
    pub fn last_modified(&self) -> Option<&str> {
        self.last_modified.as_deref()
    }
}

/// Sets ETag, Content-Location and Last-Modified on a response.
pub fn acquire_headers(response: &mut Response, fhir: &FhirResponse, base: Option<&Url>) {
    ResourceHeaders::from_fhir_response(fhir, base).apply(response.headers_mut());
}

/// Formats a timestamp as an HTTP-date (IMF-fixdate).
pub fn http_date<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String {
    timestamp
        .with_timezone(&Utc)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
