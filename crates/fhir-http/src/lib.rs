//! # helios-fhir-http - FHIR HTTP boundary adapter
//!
//! This crate sits between the HTTP transport and the component that
//! implements the [FHIR RESTful API](https://hl7.org/fhir/http.html)
//! interactions. It turns inbound requests into typed, resolved FHIR
//! interactions and turns interaction results into HTTP responses with the
//! versioning headers FHIR requires.
//!
//! ## Features
//!
//! - **Request context**: Typed per-request slots for the raw body, the
//!   resolved interaction and the server base address
//! - **Conditional headers**: `If-Match`, `If-None-Match`,
//!   `If-Modified-Since` and `If-None-Exist` as typed values
//! - **Query parameters**: Tolerant typed reads (`get_date`, `get_int`,
//!   `get_bool`) and `_summary` detection
//! - **Response headers**: `ETag`, `Content-Location` and `Last-Modified`
//!   derived from the interaction result
//! - **Pipeline**: Body capture, content negotiation, payload encoding and
//!   error mapping stages with a checked ordering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use helios_fhir_http::{
//!     AdapterConfig, FhirRequest, FhirResponse, InteractionHandler, RestError, RestResult,
//!     create_app_with_config,
//! };
//!
//! struct Store;
//!
//! #[async_trait]
//! impl InteractionHandler for Store {
//!     async fn handle(&self, request: &FhirRequest) -> RestResult<FhirResponse> {
//!         Err(RestError::NotImplemented {
//!             feature: request.kind().to_string(),
//!         })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let config = AdapterConfig::from_env();
//!     helios_fhir_http::init_logging_from(&config);
//!     let app = create_app_with_config(Store, config);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await
//! }
//! ```
//!
//! ## HTTP Headers
//!
//! - `Accept` / `_format` - Response format (application/fhir+json; an explicit XML request gets 406)
//! - `Content-Type` - Request body format
//! - `ETag` / `If-Match` - Optimistic locking for updates
//! - `If-None-Match` - Conditional read
//! - `If-None-Exist` - Conditional create
//! - `If-Modified-Since` - Conditional read by date
//!
//! ## Error Handling
//!
//! All errors are returned as FHIR [OperationOutcome](https://hl7.org/fhir/operationoutcome.html)
//! resources with appropriate HTTP status codes:
//!
//! | HTTP Status | FHIR Issue Code | Description |
//! |-------------|-----------------|-------------|
//! | 400 | invalid | Bad request / malformed body |
//! | 404 | not-found | Resource or route not found |
//! | 405 | not-supported | Method not allowed on the path |
//! | 406 | not-supported | Response format not available |
//! | 408 | timeout | Request timed out |
//! | 410 | deleted | Resource was deleted |
//! | 412 | conflict | Precondition failed |
//! | 413 | too-costly | Request body too large |
//! | 415 | not-supported | Unsupported media type |
//! | 500 | exception | Internal server error |
//!
//! ## Architecture
//!
//! - [`context`] - Request-scoped context slots
//! - [`interaction`] - Interaction resolution
//! - [`extractors`] - The [`FhirRequest`] extractor and typed query reads
//! - [`middleware`] - Pipeline stages and conditional header reads
//! - [`responses`] - Response assembly and header composition
//! - [`pipeline`] - Stage ordering and layering
//! - [`routing`] - Route configuration
//! - [`error`] - Error types and OperationOutcome generation
//! - [`config`] - Adapter configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod extractors;
pub mod fhir_types;
pub mod handler;
pub mod interaction;
pub mod middleware;
pub mod pipeline;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::AdapterConfig;
pub use context::{RequestContextExt, RequestParts};
pub use error::{PipelineError, RestError, RestResult};
pub use extractors::{FhirRequest, QueryParamsExt};
pub use fhir_types::{Binary, Resource, ResourceKey};
pub use handler::InteractionHandler;
pub use interaction::{Interaction, InteractionKind};
pub use middleware::ConditionalRequestExt;
pub use pipeline::{Pipeline, Stage};
pub use responses::{FhirResponse, build_response};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tracing::info;

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<H>(handler: H) -> Router
where
    H: InteractionHandler,
{
    create_app_with_config(handler, AdapterConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// The FHIR routes are wrapped in the standard [`Pipeline`] for the
/// configuration.
pub fn create_app_with_config<H>(handler: H, config: AdapterConfig) -> Router
where
    H: InteractionHandler,
{
    let pipeline = Pipeline::standard(&config);
    info!(
        base_url = %config.base_url,
        stages = pipeline.stages().len(),
        "Creating FHIR HTTP adapter"
    );

    let state = AppState::new(Arc::new(handler), config);
    let router = routing::create_routes(state);

    pipeline.apply(router)
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Initializes logging at the level of an [`AdapterConfig`].
pub fn init_logging_from(config: &AdapterConfig) {
    init_logging(&config.log_level);
}

fn default_filter(level: &str) -> String {
    format!("helios_fhir_http={},tower_http=debug", level)
}
