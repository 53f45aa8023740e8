//! `Tracker` implementation.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::TrackError;
use crate::{AnalyticsEvent, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT, EventName, Tracker, TrackerConfig};

/// Collector error body, `{"error": "..."}`.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl Tracker {
    /// Create a tracker posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `TrackError::Config` if the endpoint is not a valid URL.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TrackError> {
        Self::with_config(TrackerConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        })
    }

    /// Create a tracker with full configuration.
    ///
    /// Empty fields fall back to `SPLITPAGE_ANALYTICS_URL` and
    /// `SPLITPAGE_DEBUG` from the environment, then to defaults.
    ///
    /// # Errors
    ///
    /// Returns `TrackError::Config` if the endpoint is not a valid URL, or
    /// `TrackError::Network` if the HTTP client cannot be built.
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_config(cfg: TrackerConfig) -> Result<Self, TrackError> {
        let endpoint = first_non_empty(&[
            &cfg.endpoint,
            &std::env::var("SPLITPAGE_ANALYTICS_URL").unwrap_or_default(),
            DEFAULT_ENDPOINT,
        ]);
        let endpoint = reqwest::Url::parse(&endpoint)
            .map_err(|e| TrackError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;

        let debug = cfg.debug
            || std::env::var("SPLITPAGE_DEBUG").is_ok_and(|v| v == "true" || v == "1");

        let timeout = if cfg.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            cfg.timeout
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("splitpage-rust-sdk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TrackError::Network)?;

        Ok(Self {
            endpoint,
            variant: cfg.variant.filter(|v| !v.is_empty()),
            debug,
            client,
        })
    }

    /// A clone of this tracker bound to `variant`.
    #[must_use]
    pub fn for_variant(&self, variant: impl Into<String>) -> Self {
        Self {
            variant: Some(variant.into()),
            ..self.clone()
        }
    }

    /// The bound variant, if any.
    #[must_use]
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// The collector URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Build an event stamped with the current time.
    ///
    /// The bound variant wins; otherwise a string `variant` property is
    /// lifted to the top level.
    #[must_use]
    pub fn event(&self, name: EventName, properties: Option<Map<String, Value>>) -> AnalyticsEvent {
        let variant = self.variant.clone().or_else(|| {
            properties
                .as_ref()
                .and_then(|p| p.get("variant"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        });

        AnalyticsEvent {
            variant,
            properties,
            ..AnalyticsEvent::now(name)
        }
    }

    /// Track an event without waiting for delivery.
    ///
    /// The send runs on a detached task of the current Tokio runtime. Outside
    /// a runtime the event is logged and dropped. Never panics, never blocks,
    /// never retries.
    pub fn track(&self, name: EventName, properties: Option<Map<String, Value>>) {
        let event = self.event(name, properties);

        if self.debug {
            debug!(
                target: "splitpage::analytics",
                event = %event.event,
                variant = event.variant.as_deref().unwrap_or("-"),
                payload = %serde_json::to_string(&event).unwrap_or_default(),
                "analytics event"
            );
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(event = %event.event, "no async runtime, analytics event dropped");
            return;
        };

        let tracker = self.clone();
        runtime.spawn(async move {
            if let Err(e) = tracker.send(&event).await {
                warn!(event = %event.event, error = %e, "failed to track event");
            }
        });
    }

    /// Send one event and report the outcome. No retry.
    ///
    /// # Errors
    ///
    /// Returns `TrackError::Api` for a non-2xx response, `TrackError::Timeout`
    /// or `TrackError::Network` for transport failures.
    pub async fn send(&self, event: &AnalyticsEvent) -> Result<(), TrackError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(event)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrackError::Timeout
                } else {
                    TrackError::Network(e)
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        Err(TrackError::Api {
            status_code: status.as_u16(),
            message,
        })
    }

    // --- Convenience events ---

    /// `page_view` for the bound variant.
    pub fn track_page_view(&self) {
        self.track(EventName::PageView, Some(variant_properties(self.variant())));
    }

    /// `email_submit`. Only the email's domain is recorded.
    pub fn track_conversion(&self, email: Option<&str>) {
        let mut props = variant_properties(self.variant());
        if let Some(domain) = email.and_then(email_domain) {
            props.insert("email_domain".to_owned(), Value::from(domain));
        }
        self.track(EventName::EmailSubmit, Some(props));
    }

    /// `cta_click` with the CTA's location on the page.
    pub fn track_cta_click(&self, location: &str) {
        let mut props = variant_properties(self.variant());
        props.insert("location".to_owned(), Value::from(location));
        self.track(EventName::CtaClick, Some(props));
    }

    /// `feature_view` for a named feature section.
    pub fn track_feature_view(&self, feature: &str) {
        let mut props = variant_properties(self.variant());
        props.insert("feature".to_owned(), Value::from(feature));
        self.track(EventName::FeatureView, Some(props));
    }

    /// `variant_assigned`, sent once when a visitor first draws a variant.
    pub fn track_variant_assignment(&self) {
        self.track(EventName::VariantAssigned, Some(variant_properties(self.variant())));
    }
}

fn variant_properties(variant: Option<&str>) -> Map<String, Value> {
    let mut props = Map::new();
    if let Some(v) = variant {
        props.insert("variant".to_owned(), Value::from(v));
    }
    props
}

/// Part after the last `@`, if non-empty.
fn email_domain(email: &str) -> Option<&str> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|d| !d.is_empty())
}

fn first_non_empty(vals: &[&str]) -> String {
    for v in vals {
        if !v.is_empty() {
            return (*v).to_owned();
        }
    }
    String::new()
}
