//! Request body capture.
//!
//! Buffers the whole request body once, stores it in the request context as
//! the unparsed body and hands the same bytes on to the next stage. Bodies
//! over the configured limit are rejected with 413.

use std::error::Error as StdError;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use tracing::debug;

use crate::context::RequestContextExt;
use crate::error::RestError;
use crate::fhir_types::OCTET_STREAM;

/// Maximum number of body bytes the capture stage accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimit(pub usize);

/// Middleware capturing the request body.
pub async fn capture_body(
    State(BodyLimit(limit)): State<BodyLimit>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > limit) {
        return too_large(limit).into_response();
    }

    let bytes: Bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) if is_length_limit(&err) => return too_large(limit).into_response(),
        Err(err) => {
            return RestError::BadRequest {
                message: format!("Failed to read request body: {}", err),
            }
            .into_response();
        }
    };

    if !bytes.is_empty() {
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(OCTET_STREAM)
            .to_string();
        debug!(
            content_type = %content_type,
            length = bytes.len(),
            "Captured request body"
        );
        parts.save_body(&content_type, bytes.clone());
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn too_large(limit: usize) -> RestError {
    RestError::PayloadTooLarge {
        message: format!("Request body exceeds the limit of {} bytes", limit),
    }
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhir_types::Binary;
    use axum::{Router, http::StatusCode, middleware::from_fn_with_state, routing::post};
    use axum_test::TestServer;

    async fn echo(request: Request) -> String {
        let captured = request
            .get_body()
            .map(|b| format!("{}:{}", b.content_type(), b.content().len()))
            .unwrap_or_else(|| "none".to_string());
        let downstream = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .unwrap();
        format!("{}|{}", captured, downstream.len())
    }

    fn server(limit: usize) -> TestServer {
        let app = Router::new()
            .route("/Binary", post(echo))
            .layer(from_fn_with_state(BodyLimit(limit), capture_body));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_body_is_saved_and_forwarded() {
        let response = server(1024)
            .post("/Binary")
            .content_type("image/png")
            .bytes(Bytes::from_static(&[1, 2, 3, 4]))
            .await;

        response.assert_status_ok();
        response.assert_text("image/png:4|4");
    }

    #[tokio::test]
    async fn test_empty_body_is_not_saved() {
        let response = server(1024).post("/Binary").await;
        response.assert_text("none|0");
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let response = server(4)
            .post("/Binary")
            .bytes(Bytes::from_static(b"too large"))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        let outcome: serde_json::Value = response.json();
        assert_eq!(outcome["issue"][0]["code"], "too-costly");
    }

    #[test]
    fn test_default_content_type() {
        let mut request = Request::new(Body::empty());
        request.save_body(OCTET_STREAM, Bytes::from_static(b"x"));
        assert_eq!(
            request.get_body(),
            Some(&Binary::new(OCTET_STREAM, Bytes::from_static(b"x")))
        );
    }
}
