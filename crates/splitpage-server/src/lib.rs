//! `splitpage` HTTP server.
//!
//! Wires the core library into a running Axum server: the variant routing
//! middleware in front of every request, the landing pages at
//! `/landing/{variant}`, and the analytics collector at `/api/analytics`.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
