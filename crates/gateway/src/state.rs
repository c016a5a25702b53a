use std::sync::Arc;

use stubwire_engine::MessagingEngine;

#[cfg(feature = "prometheus")]
use stubwire_metrics::MetricsHandle;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct GatewayState {
    engine: Arc<MessagingEngine>,
    #[cfg(feature = "prometheus")]
    metrics: Option<MetricsHandle>,
}

impl GatewayState {
    pub fn new(engine: Arc<MessagingEngine>) -> Self {
        Self {
            engine,
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    /// Serve `handle` from the metrics endpoint.
    #[cfg(feature = "prometheus")]
    #[must_use]
    pub fn with_metrics(mut self, handle: Option<MetricsHandle>) -> Self {
        self.metrics = handle;
        self
    }

    pub fn engine(&self) -> &Arc<MessagingEngine> {
        &self.engine
    }

    #[cfg(feature = "prometheus")]
    pub fn metrics(&self) -> Option<&MetricsHandle> {
        self.metrics.as_ref()
    }
}
