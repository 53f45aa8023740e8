//! Health route: `GET /api/health`

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use splitpage_core::routing::Strategy;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub variants: Vec<VariantWeight>,
    pub entry_path: String,
    pub strategies: Vec<Strategy>,
    pub sinks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VariantWeight {
    pub id: String,
    pub weight: u32,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let variants = state
        .catalog
        .weighted()
        .map(|(v, weight)| VariantWeight {
            id: v.as_str().to_owned(),
            weight,
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        variants,
        entry_path: state.router.entry_path().to_owned(),
        strategies: state.router.strategies(),
        sinks: state.analytics.sink_names(),
    })
}
