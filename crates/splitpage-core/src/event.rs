//! Analytics event model.
//!
//! [`AnalyticsEvent`] is what clients emit. [`CollectedEvent`] is what the
//! collector accepts and hands to sinks: it validates only the envelope
//! (`event` and `timestamp`) and keeps everything else as opaque JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::EventError;

/// The closed set of tracked interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    PageView,
    EmailSubmit,
    CtaClick,
    FeatureView,
    VariantAssigned,
}

impl EventName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::EmailSubmit => "email_submit",
            Self::CtaClick => "cta_click",
            Self::FeatureView => "feature_view",
            Self::VariantAssigned => "variant_assigned",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked interaction as sent to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event: EventName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl AnalyticsEvent {
    /// Event stamped with the current time.
    #[must_use]
    pub fn now(event: EventName) -> Self {
        Self {
            event,
            variant: None,
            properties: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// An event accepted by the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedEvent {
    /// Collector-assigned identifier.
    pub id: Uuid,
    /// When the collector accepted the event.
    pub received_at: DateTime<Utc>,
    /// Event name as sent; not checked against [`EventName`].
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Client timestamp, milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    /// Any other top-level fields the client sent.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl CollectedEvent {
    /// Validate a raw payload and stamp it.
    ///
    /// `event` must be a non-empty string and `timestamp` a positive number.
    /// `variant` is taken from the top level, or from `properties.variant`
    /// when the client only sent it there.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] describing the first envelope problem found.
    pub fn from_payload(payload: Value) -> Result<Self, EventError> {
        let Value::Object(mut fields) = payload else {
            return Err(EventError::NotAnObject);
        };

        let event = match fields.remove("event") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return Err(EventError::MissingEvent),
        };

        let timestamp = fields
            .remove("timestamp")
            .as_ref()
            .and_then(timestamp_millis)
            .ok_or(EventError::MissingTimestamp)?;

        let properties = fields.remove("properties").filter(|p| !p.is_null());

        let variant = match fields.remove("variant") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => properties
                .as_ref()
                .and_then(|p| p.get("variant"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            event,
            variant,
            timestamp,
            properties,
            extra: fields,
        })
    }

    /// Client timestamp as a UTC datetime, if representable.
    #[must_use]
    pub fn client_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_millis(value: &Value) -> Option<i64> {
    let ms = match value.as_i64() {
        Some(ms) => ms,
        None => {
            let f = value.as_f64()?;
            if !f.is_finite() {
                return None;
            }
            f as i64
        }
    };
    (ms > 0).then_some(ms)
}
