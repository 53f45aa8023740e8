//! HTTP route handlers for the `splitpage` server.
//!
//! Each submodule exposes a `router()` returning an Axum `Router` that is
//! merged into the main application router.

pub mod analytics;
pub mod health;
pub mod landing;

use crate::error::AppError;

/// Fallback for unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("not found".to_owned())
}
