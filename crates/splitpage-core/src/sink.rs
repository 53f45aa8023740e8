//! Analytics sinks and the delivery pipeline.
//!
//! The sink set is fixed when the server starts. Each accepted event is
//! offered to every sink and the outcome is summarized in a [`Delivery`].
//! An event counts as stored if at least one sink took it. An empty
//! pipeline stores nothing and reports success, so analytics can be
//! switched off without the collector returning errors.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::SinkError;
use crate::event::CollectedEvent;

/// A destination for collected events.
#[async_trait::async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Short name shown in health output and failure logs.
    fn name(&self) -> &str;

    /// Store one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be stored.
    async fn record(&self, event: &CollectedEvent) -> Result<(), SinkError>;
}

/// Which sinks stored an event and which did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub stored: Vec<String>,
    pub failed: Vec<String>,
}

/// The configured sink set.
#[derive(Clone, Default)]
pub struct AnalyticsPipeline {
    sinks: Vec<Arc<dyn AnalyticsSink>>,
}

impl AnalyticsPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink. Sinks are offered events in the order they were added.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_owned()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Offer an event to every sink.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::AllSinksFailed`] when sinks are configured and
    /// none of them stored the event.
    pub async fn deliver(&self, event: &CollectedEvent) -> Result<Delivery, SinkError> {
        let mut delivery = Delivery::default();
        for sink in &self.sinks {
            match sink.record(event).await {
                Ok(()) => delivery.stored.push(sink.name().to_owned()),
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        event = %event.event,
                        sink = sink.name(),
                        error = %e,
                        "analytics sink dropped event"
                    );
                    delivery.failed.push(sink.name().to_owned());
                }
            }
        }

        if delivery.stored.is_empty() && !delivery.failed.is_empty() {
            return Err(SinkError::AllSinksFailed {
                event_id: event.id,
                attempted: delivery.failed.len(),
            });
        }
        Ok(delivery)
    }
}

impl std::fmt::Debug for AnalyticsPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsPipeline")
            .field("sinks", &self.sink_names())
            .finish()
    }
}

/// Writes each event as a structured `tracing` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait::async_trait]
impl AnalyticsSink for LogSink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "log"
    }

    async fn record(&self, event: &CollectedEvent) -> Result<(), SinkError> {
        let client_time = event
            .client_time()
            .map_or_else(|| event.timestamp.to_string(), |t| t.to_rfc3339());
        info!(
            target: "splitpage::analytics",
            id = %event.id,
            event = %event.event,
            variant = event.variant.as_deref().unwrap_or("-"),
            timestamp = %client_time,
            "analytics event received"
        );
        Ok(())
    }
}

/// Keeps events in memory. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CollectedEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub async fn events(&self) -> Vec<CollectedEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl AnalyticsSink for MemorySink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, event: &CollectedEvent) -> Result<(), SinkError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
