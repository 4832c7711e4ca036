//! Error types for the FHIR HTTP adapter.
//!
//! [`RestError`] is the semantic error an interaction handler (or a pipeline
//! stage) reports. Every variant maps to an HTTP status code and a FHIR issue
//! type, and renders as an OperationOutcome:
//!
//! | Error | HTTP Status | FHIR Issue Code |
//! |-------|-------------|-----------------|
//! | NotFound / VersionNotFound / RouteNotFound | 404 | not-found |
//! | Gone | 410 | deleted |
//! | VersionConflict | 409 | conflict |
//! | PreconditionFailed | 412 | conflict |
//! | BadRequest | 400 | invalid |
//! | MethodNotAllowed | 405 | not-supported |
//! | NotAcceptable | 406 | not-supported |
//! | Timeout | 408 | timeout |
//! | PayloadTooLarge | 413 | too-costly |
//! | UnsupportedMediaType | 415 | not-supported |
//! | NotImplemented | 501 | not-supported |
//! | InternalError | 500 | exception |
//!
//! [`PipelineError`] reports an invalid stage list when assembling the
//! request pipeline.

use axum::{
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::pipeline::Stage;
use crate::responses::format::PendingPayload;
use crate::responses::operation_outcome::{IssueType, error_outcome};

/// The primary error type for FHIR interactions.
#[derive(Debug, Clone, Error)]
pub enum RestError {
    /// Resource not found (HTTP 404).
    #[error("Resource not found: {resource_type}/{id}")]
    NotFound {
        /// The resource type (e.g., "Patient").
        resource_type: String,
        /// The resource ID.
        id: String,
    },

    /// Resource was deleted (HTTP 410 Gone).
    #[error("Resource deleted: {resource_type}/{id}")]
    Gone {
        /// The resource type.
        resource_type: String,
        /// The resource ID.
        id: String,
    },

    /// Version not found for vread (HTTP 404).
    #[error("Version not found: {resource_type}/{id}/_history/{version_id}")]
    VersionNotFound {
        /// The resource type.
        resource_type: String,
        /// The resource ID.
        id: String,
        /// The version ID.
        version_id: String,
    },

    /// Version conflict during update (HTTP 409).
    #[error("Version conflict: {message}")]
    VersionConflict {
        /// Message describing the conflict.
        message: String,
    },

    /// If-Match or If-None-Exist precondition failed (HTTP 412).
    #[error("Precondition failed: {message}")]
    PreconditionFailed {
        /// Message describing why the precondition failed.
        message: String,
    },

    /// Malformed request (HTTP 400).
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Request body in a media type the adapter cannot read (HTTP 415).
    #[error("Unsupported media type: {content_type}")]
    UnsupportedMediaType {
        /// The unsupported content type.
        content_type: String,
    },

    /// Requested response format cannot be produced (HTTP 406).
    #[error("Not acceptable: {message}")]
    NotAcceptable {
        /// Error message.
        message: String,
    },

    /// Request body exceeds the configured limit (HTTP 413).
    #[error("Payload too large: {message}")]
    PayloadTooLarge {
        /// Error message.
        message: String,
    },

    /// Method not allowed on the path (HTTP 405).
    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed {
        /// The method that was attempted.
        method: String,
        /// The request path.
        path: String,
    },

    /// No route matches the path (HTTP 404).
    #[error("Unknown route: {path}")]
    RouteNotFound {
        /// The request path.
        path: String,
    },

    /// Not implemented (HTTP 501).
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of what's not implemented.
        feature: String,
    },

    /// The request did not complete in time (HTTP 408).
    #[error("Request timed out")]
    Timeout,

    /// Internal server error (HTTP 500).
    #[error("Internal error: {message}")]
    InternalError {
        /// Error message.
        message: String,
    },

    /// Any other error status reported by the framework.
    #[error("{message}")]
    Unexpected {
        /// The status code to report.
        status: StatusCode,
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Returns the HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::NotFound { .. }
            | RestError::VersionNotFound { .. }
            | RestError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            RestError::Gone { .. } => StatusCode::GONE,
            RestError::VersionConflict { .. } => StatusCode::CONFLICT,
            RestError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RestError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            RestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RestError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RestError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            RestError::Timeout => StatusCode::REQUEST_TIMEOUT,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RestError::Unexpected { status, .. } => *status,
        }
    }

    /// Returns the FHIR issue type for this error.
    pub fn issue_type(&self) -> IssueType {
        match self {
            RestError::NotFound { .. }
            | RestError::VersionNotFound { .. }
            | RestError::RouteNotFound { .. } => IssueType::NotFound,
            RestError::Gone { .. } => IssueType::Deleted,
            RestError::VersionConflict { .. } | RestError::PreconditionFailed { .. } => {
                IssueType::Conflict
            }
            RestError::BadRequest { .. } => IssueType::Invalid,
            RestError::UnsupportedMediaType { .. }
            | RestError::NotAcceptable { .. }
            | RestError::MethodNotAllowed { .. }
            | RestError::NotImplemented { .. } => IssueType::NotSupported,
            RestError::PayloadTooLarge { .. } => IssueType::TooCostly,
            RestError::Timeout => IssueType::Timeout,
            RestError::InternalError { .. } => IssueType::Exception,
            RestError::Unexpected { status, .. } if status.is_server_error() => {
                IssueType::Exception
            }
            RestError::Unexpected { .. } => IssueType::Processing,
        }
    }

    /// Builds the OperationOutcome describing this error.
    pub fn to_operation_outcome(&self) -> crate::fhir_types::Resource {
        error_outcome(self.issue_type(), &self.to_string())
    }

    /// Classifies a bare error status produced by the web framework.
    ///
    /// `detail` is the plain-text body of the framework response, if any.
    pub fn from_framework(
        status: StatusCode,
        method: &Method,
        path: &str,
        detail: Option<String>,
    ) -> Self {
        let message = detail
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_string());

        match status {
            StatusCode::NOT_FOUND => RestError::RouteNotFound {
                path: path.to_string(),
            },
            StatusCode::METHOD_NOT_ALLOWED => RestError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            },
            StatusCode::REQUEST_TIMEOUT => RestError::Timeout,
            StatusCode::PAYLOAD_TOO_LARGE => RestError::PayloadTooLarge { message },
            StatusCode::UNSUPPORTED_MEDIA_TYPE => RestError::UnsupportedMediaType {
                content_type: message,
            },
            StatusCode::NOT_ACCEPTABLE => RestError::NotAcceptable { message },
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                RestError::BadRequest { message }
            }
            StatusCode::NOT_IMPLEMENTED => RestError::NotImplemented { feature: message },
            StatusCode::INTERNAL_SERVER_ERROR => RestError::InternalError { message },
            status => RestError::Unexpected { status, message },
        }
    }
}

/// Renders the error as a JSON OperationOutcome.
///
/// The outcome is also attached as a pending payload so that the encoder
/// stage can render it in the negotiated format.
impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let outcome = self.to_operation_outcome();
        let body = serde_json::to_vec(outcome.as_value()).unwrap_or_default();

        let mut response = (self.status(), body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(crate::middleware::content_type::FHIR_JSON),
        );
        response.extensions_mut().insert(PendingPayload(outcome));
        response
    }
}

impl From<serde_json::Error> for RestError {
    fn from(err: serde_json::Error) -> Self {
        RestError::BadRequest {
            message: format!("Invalid JSON: {}", err),
        }
    }
}

/// Result type alias for FHIR interactions.
pub type RestResult<T> = Result<T, RestError>;

/// Errors raised while assembling the request pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A stage every pipeline needs is missing.
    #[error("pipeline is missing the required {0} stage")]
    MissingStage(Stage),

    /// A stage appears more than once.
    #[error("pipeline contains the {0} stage more than once")]
    DuplicateStage(Stage),

    /// Two stages are in the wrong order.
    #[error("the {outer} stage must wrap the {inner} stage")]
    OutOfOrder {
        /// The stage that has to come first (outer).
        outer: Stage,
        /// The stage that has to come later (inner).
        inner: Stage,
    },

    /// The base address stage was requested without a base address.
    #[error("the {0} stage needs a base address")]
    MissingBaseAddress(Stage),
}
