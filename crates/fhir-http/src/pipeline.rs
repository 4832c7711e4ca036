//! Request pipeline assembly.
//!
//! The adapter only works when its stages run in a fixed relative order: the
//! negotiated format must be known before the encoder renders a payload, and
//! the encoder must see the OperationOutcomes produced by the error mapping
//! stage. A [`Pipeline`] is an ordered list of [`Stage`]s, outermost first,
//! that is checked once at startup and then layered onto the router.
//!
//! The standard order is:
//!
//! | # | Stage | Required |
//! |---|-------|----------|
//! | 1 | [`Stage::RequestId`] | no |
//! | 2 | [`Stage::Trace`] | no |
//! | 3 | [`Stage::Cors`] | no |
//! | 4 | [`Stage::ResolveBase`] | no |
//! | 5 | [`Stage::NegotiateContent`] | yes |
//! | 6 | [`Stage::EncodePayload`] | yes |
//! | 7 | [`Stage::MapErrors`] | yes |
//! | 8 | [`Stage::Timeout`] | no |
//! | 9 | [`Stage::CaptureBody`] | yes |
//!
//! # Example
//!
//! ```rust
//! use helios_fhir_http::{AdapterConfig, Pipeline, Stage};
//!
//! let config = AdapterConfig::for_testing();
//! let pipeline = Pipeline::builder(config)
//!     .stage(Stage::NegotiateContent)
//!     .stage(Stage::EncodePayload)
//!     .stage(Stage::MapErrors)
//!     .stage(Stage::CaptureBody)
//!     .build()
//!     .unwrap();
//! assert_eq!(pipeline.stages().len(), 4);
//! ```

use std::collections::HashSet;
use std::fmt;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, warn};
use url::Url;

use crate::config::AdapterConfig;
use crate::context::BaseAddress;
use crate::error::PipelineError;
use crate::middleware::{base_address, body, content_type, encoder, errors};

/// Response headers exposed to browser clients.
const EXPOSED_HEADERS: [HeaderName; 4] = [
    header::ETAG,
    header::CONTENT_LOCATION,
    header::LAST_MODIFIED,
    header::LOCATION,
];

/// A stage of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Sets and propagates `x-request-id`.
    RequestId,
    /// HTTP request tracing.
    Trace,
    /// Cross-origin resource sharing.
    Cors,
    /// Stores the server base address in the request context.
    ResolveBase,
    /// Negotiates the response format and checks the request media type.
    NegotiateContent,
    /// Serializes pending payloads.
    EncodePayload,
    /// Turns bare framework errors into OperationOutcomes.
    MapErrors,
    /// Aborts requests that exceed the configured timeout.
    Timeout,
    /// Captures the request body into the request context.
    CaptureBody,
}

impl Stage {
    /// Returns the stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RequestId => "request-id",
            Stage::Trace => "trace",
            Stage::Cors => "cors",
            Stage::ResolveBase => "resolve-base",
            Stage::NegotiateContent => "negotiate-content",
            Stage::EncodePayload => "encode-payload",
            Stage::MapErrors => "map-errors",
            Stage::Timeout => "timeout",
            Stage::CaptureBody => "capture-body",
        }
    }

    /// Returns true if every pipeline has to contain this stage.
    pub fn is_required(&self) -> bool {
        REQUIRED.contains(self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage pairs whose relative order is fixed, outer stage first.
const ORDERING: [(Stage, Stage); 2] = [
    (Stage::NegotiateContent, Stage::EncodePayload),
    (Stage::EncodePayload, Stage::MapErrors),
];

const REQUIRED: [Stage; 4] = [
    Stage::CaptureBody,
    Stage::NegotiateContent,
    Stage::EncodePayload,
    Stage::MapErrors,
];

/// An ordered, validated list of pipeline stages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    config: AdapterConfig,
    base: Option<Url>,
}

impl Pipeline {
    /// Builds the standard pipeline for a configuration.
    ///
    /// Request id and CORS follow their configuration flags. The base
    /// address stage is left out when the configured base URL does not parse.
    pub fn standard(config: &AdapterConfig) -> Self {
        let base = config.base_address();

        let mut stages = Vec::with_capacity(9);
        if config.enable_request_id {
            stages.push(Stage::RequestId);
        }
        stages.push(Stage::Trace);
        if config.enable_cors {
            stages.push(Stage::Cors);
        }
        if base.is_some() {
            stages.push(Stage::ResolveBase);
        }
        stages.extend([
            Stage::NegotiateContent,
            Stage::EncodePayload,
            Stage::MapErrors,
            Stage::Timeout,
            Stage::CaptureBody,
        ]);

        Self {
            stages,
            config: config.clone(),
            base,
        }
    }

    /// Starts a custom pipeline.
    pub fn builder(config: AdapterConfig) -> PipelineBuilder {
        PipelineBuilder {
            stages: Vec::new(),
            config,
            base: None,
        }
    }

    /// Returns the stages, outermost first.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Checks the stage list.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(*stage) {
                return Err(PipelineError::DuplicateStage(*stage));
            }
        }

        if let Some(missing) = REQUIRED.iter().find(|s| !seen.contains(*s)) {
            return Err(PipelineError::MissingStage(*missing));
        }

        for (outer, inner) in ORDERING {
            if self.position(outer) > self.position(inner) {
                return Err(PipelineError::OutOfOrder { outer, inner });
            }
        }

        if seen.contains(&Stage::ResolveBase) && self.base.is_none() {
            return Err(PipelineError::MissingBaseAddress(Stage::ResolveBase));
        }

        Ok(())
    }

    fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }

    /// Layers the stages onto a router, first stage outermost.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        debug!(
            stages = ?self.stages.iter().map(Stage::as_str).collect::<Vec<_>>(),
            "Applying request pipeline"
        );

        // Router::layer wraps everything added so far, so the innermost
        // stage is applied first.
        self.stages
            .iter()
            .rev()
            .fold(router, |router, stage| self.apply_stage(router, *stage))
    }

    fn apply_stage<S>(&self, router: Router<S>, stage: Stage) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match stage {
            Stage::RequestId => router.layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            ),
            Stage::Trace => router.layer(TraceLayer::new_for_http()),
            Stage::Cors => router.layer(build_cors_layer(&self.config)),
            Stage::ResolveBase => match &self.base {
                Some(base) => router.layer(middleware::from_fn_with_state(
                    BaseAddress(base.clone()),
                    base_address::resolve_base,
                )),
                None => {
                    warn!("No base address configured, skipping {}", stage);
                    router
                }
            },
            Stage::NegotiateContent => router.layer(middleware::from_fn_with_state(
                self.config.default_format,
                content_type::negotiate_content,
            )),
            Stage::EncodePayload => router.layer(middleware::from_fn(encoder::encode_payload)),
            Stage::MapErrors => router.layer(middleware::from_fn(errors::map_errors)),
            Stage::Timeout => router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.timeout(),
            )),
            Stage::CaptureBody => router.layer(middleware::from_fn_with_state(
                body::BodyLimit(self.config.max_body_size),
                body::capture_body,
            )),
        }
    }
}

/// Builder for custom pipelines.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    stages: Vec<Stage>,
    config: AdapterConfig,
    base: Option<Url>,
}

impl PipelineBuilder {
    /// Appends a stage inside the stages added so far.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Sets the base address used by [`Stage::ResolveBase`].
    pub fn base_address(mut self, base: Url) -> Self {
        self.base = Some(base);
        self
    }

    /// Validates and returns the pipeline.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let pipeline = Pipeline {
            stages: self.stages,
            config: self.config,
            base: self.base,
        };
        pipeline.validate()?;
        Ok(pipeline)
    }
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &AdapterConfig) -> CorsLayer {
    let mut cors = CorsLayer::new().expose_headers(EXPOSED_HEADERS);

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<Method> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<HeaderName> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}
