//! Conditional request header handling.
//!
//! Reads the HTTP conditional headers used by FHIR requests:
//! - If-Match: Optimistic locking for updates
//! - If-None-Match: Conditional read
//! - If-Modified-Since: Conditional read by date
//! - If-None-Exist: Conditional create
//!
//! Entity tags are exposed as their opaque tag text, without the surrounding
//! quotes and without the weak `W/` prefix, so `W/"3"` reads as `3`. The
//! wildcard `*` is returned as the tag text `*`; interpreting it is up to the
//! caller.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};

use crate::context::RequestParts;

/// Header name for FHIR conditional create.
pub static IF_NONE_EXIST: HeaderName = HeaderName::from_static("if-none-exist");

/// Lazy iterator over the tags of an entity-tag list header.
///
/// Yields the tag text of every well-formed element across all lines of the
/// header. Malformed elements are skipped.
pub struct EntityTags<'a> {
    lines: header::ValueIter<'a, header::HeaderValue>,
    current: &'a str,
}

impl<'a> EntityTags<'a> {
    fn new(headers: &'a HeaderMap, name: &HeaderName) -> Self {
        Self {
            lines: headers.get_all(name).iter(),
            current: "",
        }
    }
}

impl<'a> Iterator for EntityTags<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let rest = self.current.trim_start_matches([' ', '\t', ',']);
            if rest.is_empty() {
                // Lines that are not visible ASCII carry no usable tags.
                self.current = self.lines.next()?.to_str().unwrap_or("");
                continue;
            }

            let (element, remainder) = split_element(rest);
            self.current = remainder;
            if let Some(tag) = parse_entity_tag(element.trim()) {
                return Some(tag);
            }
        }
    }
}

/// Splits off the first list element, honouring quoted strings.
fn split_element(s: &str) -> (&str, &str) {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => return (&s[..i], &s[i + 1..]),
            _ => {}
        }
    }
    (s, "")
}

/// Parses one `entity-tag` or `*` into its tag text.
fn parse_entity_tag(element: &str) -> Option<&str> {
    if element == "*" {
        return Some(element);
    }
    let opaque = element.strip_prefix("W/").unwrap_or(element);
    let tag = opaque.strip_prefix('"')?.strip_suffix('"')?;
    if tag.contains('"') {
        return None;
    }
    Some(tag)
}

/// Parses an HTTP-date header value.
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Typed accessors for the conditional headers of a request.
pub trait ConditionalRequestExt: RequestParts {
    /// Returns the If-Modified-Since timestamp.
    ///
    /// An absent or unparsable header is `None`.
    fn if_modified_since(&self) -> Option<DateTime<Utc>> {
        self.headers()
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date)
    }

    /// Returns the tags of the If-None-Match header in declared order.
    ///
    /// Every call starts a new iteration. An absent header yields nothing.
    fn if_none_match(&self) -> EntityTags<'_> {
        EntityTags::new(self.headers(), &header::IF_NONE_MATCH)
    }

    /// Returns the first tag of the If-Match header.
    ///
    /// Later tags are ignored.
    fn if_match_version(&self) -> Option<String> {
        EntityTags::new(self.headers(), &header::IF_MATCH)
            .next()
            .map(String::from)
    }

    /// Returns the If-None-Exist search criteria (conditional create).
    fn if_none_exist(&self) -> Option<&str> {
        self.headers()
            .get(&IF_NONE_EXIST)
            .and_then(|v| v.to_str().ok())
    }
}

impl<T: RequestParts + ?Sized> ConditionalRequestExt for T {}

/// Extracted conditional headers from a request.
#[derive(Debug, Default, Clone)]
pub struct ConditionalHeaders {
    /// If-Match tags, in declared order.
    if_match: Vec<String>,

    /// If-None-Match tags, in declared order.
    if_none_match: Vec<String>,

    /// If-Modified-Since header value.
    if_modified_since: Option<DateTime<Utc>>,

    /// If-None-Exist header value (for conditional create).
    if_none_exist: Option<String>,
}

impl ConditionalHeaders {
    /// Creates a new ConditionalHeaders from a HeaderMap.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let if_modified_since = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        let if_none_exist = headers
            .get(&IF_NONE_EXIST)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            if_match: EntityTags::new(headers, &header::IF_MATCH)
                .map(String::from)
                .collect(),
            if_none_match: EntityTags::new(headers, &header::IF_NONE_MATCH)
                .map(String::from)
                .collect(),
            if_modified_since,
            if_none_exist,
        }
    }

    /// Returns the version the client expects for optimistic locking.
    ///
    /// Only the first If-Match tag is used.
    pub fn if_match_version(&self) -> Option<&str> {
        self.if_match.first().map(String::as_str)
    }

    /// Returns all If-None-Match tags.
    pub fn if_none_match(&self) -> &[String] {
        &self.if_none_match
    }

    /// Returns true when If-None-Match contains `*` or the given version.
    pub fn none_match_hits(&self, version_id: &str) -> bool {
        self.if_none_match
            .iter()
            .any(|tag| tag == "*" || tag == version_id)
    }

    /// Returns the If-Modified-Since header value.
    pub fn if_modified_since(&self) -> Option<DateTime<Utc>> {
        self.if_modified_since
    }

    /// Returns the If-None-Exist header value.
    pub fn if_none_exist(&self) -> Option<&str> {
        self.if_none_exist.as_deref()
    }

    /// Checks if any conditional headers are present.
    pub fn has_conditions(&self) -> bool {
        !self.if_match.is_empty()
            || !self.if_none_match.is_empty()
            || self.if_modified_since.is_some()
            || self.if_none_exist.is_some()
    }
}

/// Axum extractor for conditional headers.
impl<S> FromRequestParts<S> for ConditionalHeaders
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ConditionalHeaders::from_headers(&parts.headers))
    }
}
