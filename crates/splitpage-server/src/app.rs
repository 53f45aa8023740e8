//! Application assembly: shared state and the Axum router.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::{CACHE_CONTROL, X_CONTENT_TYPE_OPTIONS};
use axum::middleware as axum_mw;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use splitpage_core::sink::{AnalyticsPipeline, LogSink};
use splitpage_core::sink_file::FileSink;

use crate::config::ServerConfig;
use crate::middleware::variant_routing;
use crate::routes;
use crate::state::AppState;

/// Build the shared application state from configuration.
///
/// # Errors
///
/// Fails when the configured weight table cannot form a catalog; the server
/// must not start with an unresolvable catalog.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let catalog = config
        .catalog()
        .with_context(|| format!("invalid variant weights '{}'", config.variant_weights))?;

    let mut analytics = AnalyticsPipeline::new();
    if config.analytics_log {
        analytics = analytics.with_sink(Arc::new(LogSink));
    }
    if let Some(ref path) = config.analytics_file {
        let mut sink = FileSink::open(path)
            .await
            .with_context(|| format!("cannot open analytics file '{path}'"))?;
        if let Some(max_bytes) = config.analytics_file_max_bytes {
            sink = sink.with_max_bytes(max_bytes);
        }
        analytics = analytics.with_sink(Arc::new(sink));
        info!(path = %path, max_bytes = ?config.analytics_file_max_bytes, "file analytics sink registered");
    }

    let mut state = AppState::new(Arc::new(catalog), &config.routing(), Arc::new(analytics));
    state.analytics_concurrency = config.analytics_concurrency;

    info!(
        variants = ?state.catalog.variants().map(|v| v.as_str()).collect::<Vec<_>>(),
        strategies = ?state.router.strategies(),
        entry_path = %state.router.entry_path(),
        "variant routing configured"
    );

    Ok(Arc::new(state))
}

/// Build the Axum application.
///
/// Page, API, and health routes live in an inner router. The variant routing
/// middleware wraps it from the outside, so the URI it rewrites is the one
/// the inner router matches on.
pub fn build_router(state: Arc<AppState>) -> Router {
    let inner = Router::new()
        .merge(routes::landing::router(state.router.entry_path()))
        .merge(routes::analytics::router(state.analytics_concurrency))
        .merge(routes::health::router())
        .fallback(routes::not_found)
        .with_state(Arc::clone(&state));

    Router::new()
        .fallback_service(inner)
        .layer(axum_mw::from_fn_with_state(state, variant_routing))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}
