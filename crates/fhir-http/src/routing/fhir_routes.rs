//! FHIR route configuration.
//!
//! Every FHIR URL pattern is served by one generic endpoint that resolves the
//! interaction, calls the [`InteractionHandler`] and assembles the response.

use axum::{
    Router,
    extract::State,
    response::Response,
    routing::get,
};
use tracing::{debug, warn};

use crate::context::RequestContextExt;
use crate::extractors::FhirRequest;
use crate::handler::InteractionHandler;
use crate::middleware::errors::route_not_found;
use crate::responses::{FhirResponse, build_response};
use crate::state::AppState;

/// Creates all FHIR routes.
///
/// # Routes
///
/// ## System-level
/// - `GET /metadata` - CapabilityStatement
/// - `GET /` and `GET|POST /_search` - System search
/// - `POST /` - Batch/Transaction
/// - `GET /_history` - System history
///
/// ## Type-level
/// - `GET /{type}` - Search
/// - `POST /{type}` - Create
/// - `PUT|DELETE /{type}` - Conditional update / delete
/// - `GET|POST /{type}/_search` - Search
/// - `GET /{type}/_history` - Type history
///
/// ## Instance-level
/// - `GET /{type}/{id}` - Read
/// - `PUT /{type}/{id}` - Update
/// - `PATCH /{type}/{id}` - Patch
/// - `DELETE /{type}/{id}` - Delete
/// - `GET /{type}/{id}/_history` - Instance history
/// - `GET /{type}/{id}/_history/{version_id}` - Version read
///
/// ## Operations
/// - `GET|POST /$op`, `/{type}/$op`, `/{type}/{id}/$op`
///
/// Unmatched paths answer 404 with an OperationOutcome.
pub fn create_routes<H>(state: AppState<H>) -> Router
where
    H: InteractionHandler,
{
    let endpoint = fhir_endpoint::<H>;

    Router::new()
        // System-level routes
        .route("/", get(endpoint).post(endpoint))
        .route("/metadata", get(endpoint))
        .route("/_history", get(endpoint))
        .route("/_search", get(endpoint).post(endpoint))
        // Type-level routes
        .route(
            "/{resource_type}",
            get(endpoint).post(endpoint).put(endpoint).delete(endpoint),
        )
        .route("/{resource_type}/_search", get(endpoint).post(endpoint))
        .route("/{resource_type}/_history", get(endpoint))
        // Instance-level routes
        .route(
            "/{resource_type}/{id}",
            get(endpoint)
                .put(endpoint)
                .patch(endpoint)
                .delete(endpoint)
                .post(endpoint),
        )
        .route("/{resource_type}/{id}/_history", get(endpoint))
        .route(
            "/{resource_type}/{id}/_history/{version_id}",
            get(endpoint),
        )
        .route(
            "/{resource_type}/{id}/{operation}",
            get(endpoint).post(endpoint),
        )
        .fallback(route_not_found)
        // State
        .with_state(state)
}

/// The generic FHIR interaction endpoint.
///
/// Handler errors become OperationOutcome results; the resolved interaction
/// is updated with the key of the result before the response is assembled.
pub async fn fhir_endpoint<H>(
    State(state): State<AppState<H>>,
    mut request: FhirRequest,
) -> Response
where
    H: InteractionHandler,
{
    debug!(
        interaction = %request.kind(),
        resource_type = request.interaction().target_type().unwrap_or("-"),
        "Handling FHIR interaction"
    );

    let result = match state.handler().handle(&request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(interaction = %request.kind(), error = %err, "Interaction failed");
            FhirResponse::from(err)
        }
    };

    let entry = request.interaction().clone().with_key(result.key().cloned());
    request.save_entry(entry);

    build_response(&request, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;
    use crate::error::{RestError, RestResult};
    use crate::fhir_types::Resource;
    use crate::interaction::InteractionKind;
    use crate::pipeline::Pipeline;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl InteractionHandler for Echo {
        async fn handle(&self, request: &FhirRequest) -> RestResult<FhirResponse> {
            match request.kind() {
                InteractionKind::Read => Ok(FhirResponse::ok(Resource::new(json!({
                    "resourceType": request.interaction().target_type(),
                    "id": request.interaction().target_id(),
                    "meta": { "versionId": "1" }
                })))),
                kind => Err(RestError::NotImplemented {
                    feature: kind.to_string(),
                }),
            }
        }
    }

    fn server() -> TestServer {
        let config = AdapterConfig::for_testing();
        let pipeline = Pipeline::standard(&config);
        let state = AppState::new(Arc::new(Echo), config);
        TestServer::new(pipeline.apply(create_routes(state))).unwrap()
    }

    #[tokio::test]
    async fn test_read_route() {
        let response = server().get("/Patient/abc").await;
        response.assert_status_ok();
        assert_eq!(response.header("etag"), "\"1\"");
        assert_eq!(
            response.header("content-location"),
            "http://localhost:8080/Patient/abc/_history/1"
        );
    }

    #[tokio::test]
    async fn test_handler_error_is_outcome() {
        let response = server().get("/Patient/abc/_history").await;
        response.assert_status(StatusCode::NOT_IMPLEMENTED);
        let body: Value = response.json();
        assert_eq!(body["resourceType"], "OperationOutcome");
    }

    #[tokio::test]
    async fn test_unresolvable_post() {
        let response = server().post("/Patient/abc").await;
        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }
}
