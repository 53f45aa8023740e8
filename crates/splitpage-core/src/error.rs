//! Error types for `splitpage-core`.
//!
//! Catalog errors are configuration faults: they surface once, at startup,
//! and the server refuses to serve traffic with an unresolvable catalog.
//! Nothing on the per-request path returns an error; malformed client state
//! is recovered locally by the assignment engine and the router.

/// Errors from building a [`VariantCatalog`](crate::catalog::VariantCatalog).
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog has no variants.
    #[error("variant catalog is empty")]
    Empty,

    /// Every weight is zero, so nothing can ever be drawn.
    #[error("variant weights must sum to a positive total")]
    ZeroTotalWeight,

    /// The same identifier was declared twice, ignoring ASCII case.
    #[error("duplicate variant '{id}'")]
    Duplicate { id: String },

    /// The identifier is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid variant identifier '{id}'")]
    InvalidId { id: String },

    /// A `ID=WEIGHT` entry in a weight string could not be parsed.
    #[error("malformed weight entry '{entry}': {reason}")]
    MalformedEntry { entry: String, reason: String },
}

/// Errors from analytics sinks.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// A specific sink failed to record an event.
    #[error("analytics sink '{name}' failed: {reason}")]
    BackendFailure { name: String, reason: String },

    /// Failed to serialize an event for writing.
    #[error("analytics serialization failed: {reason}")]
    Serialization { reason: String },

    /// Every registered sink failed; the event was not stored anywhere.
    #[error("event {event_id} rejected by all {attempted} analytics sinks")]
    AllSinksFailed { event_id: uuid::Uuid, attempted: usize },
}

/// Errors from validating an inbound analytics payload.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The body was not a JSON object.
    #[error("analytics payload must be a JSON object")]
    NotAnObject,

    /// `event` is missing, empty, or not a string.
    #[error("missing or empty 'event' field")]
    MissingEvent,

    /// `timestamp` is missing, zero, or not a number.
    #[error("missing or invalid 'timestamp' field")]
    MissingTimestamp,
}
