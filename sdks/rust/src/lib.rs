//! `splitpage` SDK for Rust.
//!
//! Fire-and-forget analytics tracking for split-tested landing pages. Every
//! `track*` call builds an event, optionally mirrors it to the debug log, and
//! hands the HTTP send to a detached task. The caller never waits and never
//! sees a failure: lost events are logged and dropped, never retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use splitpage_sdk::{EventName, Tracker};
//!
//! # async fn example() -> Result<(), splitpage_sdk::TrackError> {
//! let tracker = Tracker::new("https://example.com/api/analytics")?.for_variant("B");
//! tracker.track_page_view();
//! tracker.track_cta_click("hero");
//! tracker.track(EventName::FeatureView, None);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use error::TrackError;
pub use splitpage_core::event::{AnalyticsEvent, EventName};

use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/analytics";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Collector URL. Default: `SPLITPAGE_ANALYTICS_URL`, else
    /// `http://127.0.0.1:3000/api/analytics`.
    pub endpoint: String,
    /// Variant attached to every event. Events without a bound variant take
    /// one from their `variant` property, if present.
    pub variant: Option<String>,
    /// Mirror every event to the `debug` log before sending.
    pub debug: bool,
    /// Per-request timeout. Default: 5 seconds.
    pub timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            variant: None,
            debug: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Analytics event emitter.
///
/// Cheap to clone; clones share the underlying HTTP connection pool.
#[derive(Debug, Clone)]
pub struct Tracker {
    endpoint: reqwest::Url,
    variant: Option<String>,
    debug: bool,
    client: reqwest::Client,
}
