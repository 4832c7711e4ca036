//! Resource-level types exchanged across the HTTP boundary.
//!
//! Resources are kept as JSON documents; this module only exposes the handful
//! of fields the adapter needs to compute response headers:
//!
//! - [`Resource`] - a FHIR resource with typed accessors for `meta`
//! - [`ResourceKey`] - type, id and version of one resource instance
//! - [`Binary`] - raw request bytes with their declared content type

use axum::body::Bytes;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Content type assumed for bodies that declare none.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A FHIR resource held as a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Value);

impl Resource {
    /// Wraps a JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the `resourceType` field.
    pub fn resource_type(&self) -> Option<&str> {
        self.0.get("resourceType").and_then(Value::as_str)
    }

    /// Returns the logical id.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// Returns `meta.versionId`.
    pub fn version_id(&self) -> Option<&str> {
        self.0
            .get("meta")
            .and_then(|meta| meta.get("versionId"))
            .and_then(Value::as_str)
    }

    /// Returns `meta.lastUpdated` as a timestamp.
    ///
    /// A value that is not a valid FHIR instant is treated as absent.
    pub fn last_updated(&self) -> Option<DateTime<FixedOffset>> {
        self.0
            .get("meta")
            .and_then(|meta| meta.get("lastUpdated"))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    /// Builds the key of this resource from its type, id and version.
    pub fn key(&self) -> Option<ResourceKey> {
        let key = ResourceKey::new(self.resource_type()?, self.id()?);
        Some(match self.version_id() {
            Some(version_id) => key.with_version(version_id),
            None => key,
        })
    }

    /// Returns true for `Binary` resources.
    pub fn is_binary(&self) -> bool {
        self.resource_type() == Some("Binary")
    }

    /// Returns a reference to the JSON document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the resource and returns the JSON document.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Resource {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Identifies one version of one resource instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    /// The resource type (e.g., "Patient").
    pub type_name: String,
    /// The logical id.
    pub resource_id: String,
    /// The version id, if the key points at a specific version.
    pub version_id: Option<String>,
}

impl ResourceKey {
    /// Creates an unversioned key.
    pub fn new(type_name: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            resource_id: resource_id.into(),
            version_id: None,
        }
    }

    /// Sets the version id.
    pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Returns the version id when it is present and non-empty.
    pub fn version(&self) -> Option<&str> {
        self.version_id.as_deref().filter(|v| !v.is_empty())
    }

    /// Returns the relative reference `Type/id[/_history/vid]`.
    pub fn to_relative_path(&self) -> String {
        match self.version() {
            Some(vid) => format!(
                "{}/{}/_history/{}",
                self.type_name, self.resource_id, vid
            ),
            None => format!("{}/{}", self.type_name, self.resource_id),
        }
    }

    /// Resolves the key against a server base address.
    ///
    /// Path segments are appended to the base path, so a base of
    /// `http://example.org/fhir` yields
    /// `http://example.org/fhir/Patient/1/_history/3`.
    pub fn to_uri(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&self.type_name)
                .push(&self.resource_id);
            if let Some(vid) = self.version() {
                segments.push("_history").push(vid);
            }
        }
        url
    }
}

/// Raw bytes with a declared content type.
///
/// Used to keep the unparsed request body around for later pipeline stages
/// and for `Binary` resources sent in their native format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    content_type: String,
    content: Bytes,
}

impl Binary {
    /// Creates a new Binary.
    pub fn new(content_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            content: content.into(),
        }
    }

    /// Returns the declared content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Returns the raw content.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Returns true when there is no content.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Converts to a FHIR `Binary` resource with base64 `data`.
    pub fn to_resource(&self) -> Resource {
        Resource::new(serde_json::json!({
            "resourceType": "Binary",
            "contentType": self.content_type,
            "data": STANDARD.encode(&self.content),
        }))
    }

    /// Extracts the raw content of a FHIR `Binary` resource.
    ///
    /// Returns `None` for other resource types or undecodable `data`.
    pub fn from_resource(resource: &Resource) -> Option<Self> {
        if !resource.is_binary() {
            return None;
        }
        let value = resource.as_value();
        let content_type = value
            .get("contentType")
            .and_then(Value::as_str)
            .unwrap_or(OCTET_STREAM);
        let data = match value.get("data").and_then(Value::as_str) {
            Some(data) => STANDARD.decode(data).ok()?,
            None => Vec::new(),
        };
        Some(Self::new(content_type, data))
    }
}
