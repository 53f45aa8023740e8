//! Shared application state for the `splitpage` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers and the routing middleware via `Arc`. Everything in it is
//! immutable after construction.

use std::sync::Arc;

use splitpage_core::catalog::VariantCatalog;
use splitpage_core::routing::{RequestRouter, RoutingConfig};
use splitpage_core::sink::AnalyticsPipeline;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// The variant catalog.
    pub catalog: Arc<VariantCatalog>,
    /// Path/host routing decisions.
    pub router: RequestRouter,
    /// Collected-event fan-out.
    pub analytics: Arc<AnalyticsPipeline>,
    /// Collector concurrency cap.
    pub analytics_concurrency: usize,
}

impl AppState {
    #[must_use]
    pub fn new(
        catalog: Arc<VariantCatalog>,
        routing: &RoutingConfig,
        analytics: Arc<AnalyticsPipeline>,
    ) -> Self {
        Self {
            router: RequestRouter::new(Arc::clone(&catalog), routing),
            catalog,
            analytics,
            analytics_concurrency: 256,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}
