//! Error types for the `splitpage` SDK.

/// Errors from building a tracker or sending an event.
///
/// `track*` methods never return these; they are logged and dropped. Only
/// construction and the explicit [`Tracker::send`](crate::Tracker::send)
/// surface them.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// Invalid configuration (e.g. an unparseable endpoint URL).
    #[error("splitpage config error: {0}")]
    Config(String),

    /// The collector answered with a non-2xx status.
    #[error("splitpage collector error {status_code}: {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the collector.
        message: String,
    },

    /// Request timed out.
    #[error("splitpage request timed out")]
    Timeout,

    /// Network or HTTP client error.
    #[error("splitpage network error: {0}")]
    Network(#[from] reqwest::Error),
}
