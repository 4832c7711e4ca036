//! Error mapping stage.
//!
//! The web framework and the tower layers answer some requests on their own:
//! unknown routes, unsupported methods, timeouts and extractor rejections.
//! Those responses carry a bare status and at most a plain-text body. This
//! stage replaces them with an OperationOutcome so that every error leaves
//! the adapter as a FHIR resource.

use axum::{
    extract::Request,
    http::{HeaderMap, Method, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::context::ResolvedInteraction;
use crate::error::RestError;
use crate::middleware::content_type::FhirFormat;
use crate::responses::format::PendingPayload;

/// Upper bound on how much of a framework error body is kept as detail.
const MAX_DETAIL_BYTES: usize = 4096;

/// Middleware mapping framework errors to OperationOutcomes.
pub async fn map_errors(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    map_error_response(response, &method, &path).await
}

/// Replaces a bare error response with an OperationOutcome response.
///
/// Successful responses, responses that already carry a FHIR payload and
/// responses assembled for a resolved interaction are returned unchanged.
pub async fn map_error_response(response: Response, method: &Method, path: &str) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_fhir(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let detail = axum::body::to_bytes(body, MAX_DETAIL_BYTES)
        .await
        .ok()
        .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok());

    let err = RestError::from_framework(status, method, path, detail);
    debug!(
        status = status.as_u16(),
        method = %method,
        path = %path,
        error = %err,
        "Mapped framework error"
    );

    let mut mapped = err.into_response();
    copy_header(&parts.headers, mapped.headers_mut(), header::ALLOW);
    mapped
}

fn is_fhir(response: &Response) -> bool {
    response.extensions().get::<PendingPayload>().is_some()
        || response.extensions().get::<ResolvedInteraction>().is_some()
        || response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(FhirFormat::parse)
            .is_some()
}

fn copy_header(from: &HeaderMap, to: &mut HeaderMap, name: header::HeaderName) {
    if let Some(value) = from.get(&name) {
        to.insert(name, value.clone());
    }
}

/// Fallback handler for paths no FHIR route matches.
pub async fn route_not_found(request: Request) -> Response {
    RestError::RouteNotFound {
        path: request.uri().path().to_string(),
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;

    fn bare(status: StatusCode, body: &'static str) -> Response {
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        response
    }

    #[tokio::test]
    async fn test_maps_method_not_allowed() {
        let mut response = bare(StatusCode::METHOD_NOT_ALLOWED, "");
        response
            .headers_mut()
            .insert(header::ALLOW, "GET,HEAD".parse().unwrap());

        let mapped = map_error_response(response, &Method::POST, "/metadata").await;

        assert_eq!(mapped.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(mapped.headers()[header::ALLOW], "GET,HEAD");
        let PendingPayload(outcome) = mapped.extensions().get::<PendingPayload>().unwrap();
        assert_eq!(outcome.as_value()["issue"][0]["code"], "not-supported");
    }

    #[tokio::test]
    async fn test_maps_timeout() {
        let mapped =
            map_error_response(bare(StatusCode::REQUEST_TIMEOUT, ""), &Method::GET, "/").await;
        assert_eq!(mapped.status(), StatusCode::REQUEST_TIMEOUT);
        let PendingPayload(outcome) = mapped.extensions().get::<PendingPayload>().unwrap();
        assert_eq!(outcome.as_value()["issue"][0]["code"], "timeout");
    }

    #[tokio::test]
    async fn test_keeps_rejection_text() {
        let mapped = map_error_response(
            bare(StatusCode::BAD_REQUEST, "Invalid query string"),
            &Method::GET,
            "/Patient",
        )
        .await;
        let PendingPayload(outcome) = mapped.extensions().get::<PendingPayload>().unwrap();
        assert_eq!(
            outcome.as_value()["issue"][0]["details"]["text"],
            "Bad request: Invalid query string"
        );
    }

    #[tokio::test]
    async fn test_leaves_fhir_errors_alone() {
        let original = RestError::Gone {
            resource_type: "Patient".to_string(),
            id: "1".to_string(),
        }
        .into_response();
        let mapped = map_error_response(original, &Method::GET, "/Patient/1").await;
        let PendingPayload(outcome) = mapped.extensions().get::<PendingPayload>().unwrap();
        assert_eq!(outcome.as_value()["issue"][0]["code"], "deleted");
    }

    #[tokio::test]
    async fn test_leaves_assembled_responses_alone() {
        use crate::interaction::{Interaction, InteractionKind};

        let mut response = bare(StatusCode::GONE, "");
        response
            .extensions_mut()
            .insert(ResolvedInteraction(Interaction::new(InteractionKind::Read)));
        let mapped = map_error_response(response, &Method::GET, "/Patient/1").await;
        assert_eq!(mapped.status(), StatusCode::GONE);
        assert!(mapped.extensions().get::<PendingPayload>().is_none());
    }

    #[tokio::test]
    async fn test_leaves_success_alone() {
        let mapped = map_error_response(bare(StatusCode::OK, "ok"), &Method::GET, "/").await;
        assert_eq!(mapped.status(), StatusCode::OK);
        assert!(mapped.extensions().get::<PendingPayload>().is_none());
    }
}
