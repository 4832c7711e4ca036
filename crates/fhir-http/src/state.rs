//! Application state shared by the FHIR endpoint.

use std::sync::Arc;

use crate::config::AdapterConfig;
use crate::handler::InteractionHandler;

/// Shared application state.
///
/// # Type Parameters
///
/// * `H` - The interaction handler (must implement [`InteractionHandler`])
pub struct AppState<H> {
    /// The interaction handler.
    handler: Arc<H>,

    /// Adapter configuration.
    config: Arc<AdapterConfig>,
}

// Manually implement Clone since H is wrapped in Arc and doesn't need to be Clone
impl<H> Clone for AppState<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: InteractionHandler> AppState<H> {
    /// Creates a new AppState with the given handler and configuration.
    pub fn new(handler: Arc<H>, config: AdapterConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the interaction handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns a reference to the adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}
