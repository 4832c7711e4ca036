//! Adapter configuration.
//!
//! Supports programmatic configuration, command line arguments and
//! environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FHIR_HTTP_BASE_URL` | http://localhost:8080 | Base URL for Content-Location |
//! | `FHIR_HTTP_LOG_LEVEL` | info | Log level |
//! | `FHIR_HTTP_MAX_BODY_SIZE` | 10485760 | Max request body (bytes) |
//! | `FHIR_HTTP_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `FHIR_HTTP_ENABLE_CORS` | true | Enable CORS |
//! | `FHIR_HTTP_CORS_ORIGINS` | * | Allowed origins |
//! | `FHIR_HTTP_CORS_METHODS` | GET,POST,PUT,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `FHIR_HTTP_CORS_HEADERS` | Content-Type,Accept,If-Match,... | Allowed headers |
//! | `FHIR_HTTP_ENABLE_REQUEST_ID` | true | Set and propagate `x-request-id` |
//! | `FHIR_HTTP_DEFAULT_FORMAT` | json | Response format when the client names none |
//!
//! # Example
//!
//! ```rust
//! use helios_fhir_http::AdapterConfig;
//!
//! let config = AdapterConfig {
//!     base_url: "https://fhir.example.org/r4".to_string(),
//!     enable_cors: false,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use clap::Parser;
use tracing::warn;
use url::Url;

use crate::middleware::content_type::FhirFormat;

const DEFAULT_CORS_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";
const DEFAULT_CORS_HEADERS: &str =
    "Content-Type,Accept,If-Match,If-None-Match,If-None-Exist,If-Modified-Since,Prefer";

/// Configuration of the FHIR HTTP adapter.
#[derive(Debug, Clone, Parser)]
#[command(name = "fhir-http")]
#[command(about = "FHIR HTTP boundary adapter")]
pub struct AdapterConfig {
    /// Base URL of the server (used in Content-Location headers).
    #[arg(long, env = "FHIR_HTTP_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Log level (error, warn, info, debug, trace), applied by
    /// [`init_logging_from`](crate::init_logging_from).
    #[arg(long, env = "FHIR_HTTP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "FHIR_HTTP_MAX_BODY_SIZE", default_value = "10485760")]
    pub max_body_size: usize,

    /// Request timeout in seconds.
    #[arg(long, env = "FHIR_HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "FHIR_HTTP_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "FHIR_HTTP_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(long, env = "FHIR_HTTP_CORS_METHODS", default_value = DEFAULT_CORS_METHODS)]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(long, env = "FHIR_HTTP_CORS_HEADERS", default_value = DEFAULT_CORS_HEADERS)]
    pub cors_headers: String,

    /// Enable request ID tracking.
    #[arg(long, env = "FHIR_HTTP_ENABLE_REQUEST_ID", default_value = "true")]
    pub enable_request_id: bool,

    /// Response format used when the client names none.
    #[arg(long, env = "FHIR_HTTP_DEFAULT_FORMAT", value_enum, default_value = "json")]
    pub default_format: FhirFormat,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            log_level: "info".to_string(),
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: DEFAULT_CORS_METHODS.to_string(),
            cors_headers: DEFAULT_CORS_HEADERS.to_string(),
            enable_request_id: true,
            default_format: FhirFormat::Json,
        }
    }
}

impl AdapterConfig {
    /// Creates a new AdapterConfig from environment variables.
    ///
    /// Falls back to the defaults when the environment does not parse.
    pub fn from_env() -> Self {
        Self::try_parse_from(["fhir-http"]).unwrap_or_default()
    }

    /// Returns the parsed base URL.
    ///
    /// An unparsable base URL is logged and treated as absent.
    pub fn base_address(&self) -> Option<Url> {
        match Url::parse(&self.base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(base_url = %self.base_url, error = %e, "Ignoring invalid base URL");
                None
            }
        }
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.base_url) {
            Ok(url) if url.cannot_be_a_base() => {
                errors.push(format!("Base URL '{}' cannot be a base", self.base_url));
            }
            Ok(_) => {}
            Err(e) => errors.push(format!("Invalid base URL '{}': {}", self.base_url, e)),
        }

        if self.max_body_size == 0 {
            errors.push("Max body size cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    pub fn for_testing() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            log_level: "debug".to_string(),
            max_body_size: 64 * 1024,
            request_timeout: 5, // Shorter timeout for tests
            enable_cors: false,
            enable_request_id: false,
            ..Default::default()
        }
    }
}
