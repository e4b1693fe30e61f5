//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::domain::ChannelRegistry;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Process-wide channel registry.
    pub registry: Arc<ChannelRegistry>,
    /// Relay settings (frame limit, queues, throttle).
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Builds the application state from a loaded configuration.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            registry: Arc::new(ChannelRegistry::new()),
            config: Arc::new(config),
        }
    }
}
