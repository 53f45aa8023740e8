//! Core library for `splitpage`.
//!
//! Contains the variant catalog, the sticky weighted assignment engine, the
//! request router that decides path/host rewrites, the cookie abstraction it
//! reads and writes through, the analytics event model, and the sinks the
//! collector fans events out to. This crate knows nothing about HTTP
//! frameworks; the server adapts it to Axum.

pub mod assignment;
pub mod catalog;
pub mod cookie;
pub mod error;
pub mod event;
pub mod routing;
pub mod sink;
pub mod sink_file;
