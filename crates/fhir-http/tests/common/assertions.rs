//! HTTP response assertions.
//!
//! Provides assertion utilities for testing adapter responses.

use axum_test::TestResponse;
use serde_json::Value;

/// Asserts that the response has the expected status code.
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status_code().as_u16();
    assert_eq!(
        actual, expected,
        "Expected status {}, got {}",
        expected, actual
    );
}

/// Asserts that the response has an ETag header with the expected version.
pub fn assert_etag(response: &TestResponse, version_id: &str) {
    let etag = response
        .headers()
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    assert_eq!(
        etag,
        Some(format!("\"{}\"", version_id)),
        "Unexpected ETag header"
    );
}

/// Asserts that none of the versioning headers are present.
pub fn assert_no_versioning_headers(response: &TestResponse) {
    for name in ["etag", "content-location", "last-modified"] {
        assert!(
            !response.headers().contains_key(name),
            "Unexpected {} header",
            name
        );
    }
}

/// Asserts that the response carries the Content-Location header.
pub fn assert_content_location(response: &TestResponse, expected: &str) {
    let location = response
        .headers()
        .get("content-location")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    assert_eq!(location.as_deref(), Some(expected));
}

/// Asserts that the Content-Type header starts with the given media type.
pub fn assert_content_type(response: &TestResponse, expected: &str) {
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert!(
        content_type.starts_with(expected),
        "Expected content type {}, got {}",
        expected,
        content_type
    );
}

/// Asserts that the response body is a FHIR resource of the expected type.
pub fn assert_resource_type(body: &Value, expected: &str) {
    let actual = body
        .get("resourceType")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    assert_eq!(
        actual, expected,
        "Expected resourceType {}, got {}",
        expected, actual
    );
}

/// Asserts that the response is an OperationOutcome with the given issue code.
pub fn assert_outcome(response: &TestResponse, code: &str) {
    let body: Value = response.json();
    assert_resource_type(&body, "OperationOutcome");
    assert_eq!(
        body["issue"][0]["code"], code,
        "Unexpected issue code in {}",
        body
    );
}
