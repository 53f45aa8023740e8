//! Analytics collector: `POST /api/analytics`
//!
//! Accepts events from pages and SDK clients, validates the envelope, and
//! hands the event to the sink pipeline. The body is parsed by hand rather
//! than through the `Json` extractor so every malformed payload gets the
//! same `400 {"error": ...}` shape.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::debug;

use splitpage_core::event::CollectedEvent;

use crate::error::AppError;
use crate::state::AppState;

/// Build the collector router.
pub fn router(concurrency: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics", post(collect))
        .layer(tower::limit::ConcurrencyLimitLayer::new(concurrency))
}

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub success: bool,
}

/// Validate and record one event.
async fn collect(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CollectResponse>, AppError> {
    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "analytics body is not valid JSON");
        AppError::BadRequest("Invalid event data".to_owned())
    })?;

    let event = CollectedEvent::from_payload(payload)?;
    let delivery = state.analytics.deliver(&event).await?;
    debug!(
        event_id = %event.id,
        stored = ?delivery.stored,
        failed = ?delivery.failed,
        "analytics event delivered"
    );

    Ok(Json(CollectResponse { success: true }))
}
