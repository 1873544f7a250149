// Private module declaration
mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers the two halves of the write path:
// - event delivery (outbox rows delivered, sessions reached, batch latency)
// - realtime sessions (currently connected session count)
//
// All metrics are registered with Prometheus and can be scraped via /metrics.
// ============================================================================

/// Central metrics registry for the service.
pub struct Metrics {
    registry: Registry,

    // Delivery Metrics
    pub events_delivered: IntCounterVec,
    pub sessions_reached: IntCounterVec,
    pub delivery_batch_duration: Histogram,

    // Session Metrics
    pub active_sessions: IntGauge,

    // Delivery failures surfaced by the relay
    pub delivery_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_delivered = IntCounterVec::new(
            Opts::new(
                "outbox_events_delivered_total",
                "Outbox events delivered to the session registry",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(events_delivered.clone()))?;

        let sessions_reached = IntCounterVec::new(
            Opts::new(
                "event_sessions_reached_total",
                "Client sessions an event payload was pushed to",
            ),
            &["event_type"],
        )?;
        registry.register(Box::new(sessions_reached.clone()))?;

        let delivery_batch_duration = Histogram::with_opts(
            HistogramOpts::new(
                "outbox_delivery_batch_duration_seconds",
                "Time spent delivering one outbox batch",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(delivery_batch_duration.clone()))?;

        let active_sessions = IntGauge::new(
            "active_client_sessions",
            "Currently connected client sessions",
        )?;
        registry.register(Box::new(active_sessions.clone()))?;

        let delivery_failures = IntCounter::new(
            "outbox_delivery_failures_total",
            "Relay ticks that failed and will be retried",
        )?;
        registry.register(Box::new(delivery_failures.clone()))?;

        Ok(Self {
            registry,
            events_delivered,
            sessions_reached,
            delivery_batch_duration,
            active_sessions,
            delivery_failures,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record one delivered outbox event and how many sessions it reached.
    pub fn record_delivery(&self, event_type: &str, sessions: usize) {
        self.events_delivered.with_label_values(&[event_type]).inc();
        self.sessions_reached
            .with_label_values(&[event_type])
            .inc_by(sessions as u64);
    }

    pub fn observe_delivery_batch(&self, duration_secs: f64) {
        self.delivery_batch_duration.observe(duration_secs);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.inc();
    }

    pub fn set_active_sessions(&self, count: i64) {
        self.active_sessions.set(count);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(metrics.registry.gather().len() > 0);
    }

    #[test]
    fn test_record_delivery() {
        let metrics = Metrics::new().unwrap();
        metrics.record_delivery("user_topic", 3);
        metrics.record_delivery("user_topic", 2);

        let gathered = metrics.registry.gather();
        let delivered = gathered
            .iter()
            .find(|m| m.name() == "outbox_events_delivered_total")
            .unwrap();
        assert_eq!(delivered.metric[0].counter.value, Some(2.0));

        let reached = gathered
            .iter()
            .find(|m| m.name() == "event_sessions_reached_total")
            .unwrap();
        assert_eq!(reached.metric[0].counter.value, Some(5.0));
    }

    #[test]
    fn test_active_sessions_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_active_sessions(4);
        metrics.set_active_sessions(2);

        let gathered = metrics.registry.gather();
        let gauge = gathered
            .iter()
            .find(|m| m.name() == "active_client_sessions")
            .unwrap();
        assert_eq!(gauge.metric[0].gauge.value, Some(2.0));
    }

    #[test]
    fn test_delivery_failures_counter() {
        let metrics = Metrics::new().unwrap();
        metrics.record_delivery_failure();

        let gathered = metrics.registry.gather();
        let failures = gathered
            .iter()
            .find(|m| m.name() == "outbox_delivery_failures_total")
            .unwrap();
        assert_eq!(failures.metric[0].counter.value, Some(1.0));
    }
}
