use actix::Addr;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};

use crate::metrics::Metrics;
use crate::store::PgUserTopicStore;
use super::registry::{DeliverToUsers, SessionRegistry};

// ============================================================================
// Outbox Relay - Drains committed events to connected sessions
// ============================================================================
//
// Polls the event_outbox table for rows whose transaction has committed and
// hands each payload to the session registry, then marks the row delivered.
// Because queued events only become visible at commit, nothing the relay
// sees can belong to a rolled-back change.
//
// A failed tick leaves its rows undelivered; they are picked up again on the
// next interval. Rows are processed in emission (seq) order so a user's
// snapshot event always precedes the structured event from the same call.
//
// ============================================================================

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const BATCH_SIZE: i64 = 100;

pub struct OutboxRelay {
    store: PgUserTopicStore,
    registry: Addr<SessionRegistry>,
    metrics: Arc<Metrics>,
}

impl OutboxRelay {
    pub fn new(
        store: PgUserTopicStore,
        registry: Addr<SessionRegistry>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            registry,
            metrics,
        }
    }

    /// Run the polling loop until the task is dropped.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                poll_interval_secs = POLL_INTERVAL.as_secs(),
                "🔄 Outbox relay started"
            );

            loop {
                match self.tick().await {
                    Ok(0) => {}
                    Ok(delivered) => {
                        tracing::info!(delivered, "📬 Delivered outbox events");
                    }
                    Err(e) => {
                        self.metrics.record_delivery_failure();
                        tracing::error!(error = %e, "Outbox relay tick failed, will retry");
                    }
                }

                sleep(POLL_INTERVAL).await;
            }
        })
    }

    /// Deliver one batch. Returns the number of outbox rows delivered.
    async fn tick(&self) -> anyhow::Result<usize> {
        let events = self.store.undelivered_events(BATCH_SIZE).await?;
        if events.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let mut delivered = 0;

        for event in events {
            let event_type = event_type_of(&event.payload);

            let reached = self
                .registry
                .send(DeliverToUsers {
                    recipients: event.recipients.clone(),
                    payload: event.payload.clone(),
                })
                .await?;

            self.store.mark_delivered(event.seq).await?;
            self.metrics.record_delivery(&event_type, reached);
            delivered += 1;

            tracing::debug!(
                seq = event.seq,
                event_type = %event_type,
                recipients = event.recipients.len(),
                sessions_reached = reached,
                "Delivered outbox event"
            );
        }

        self.metrics
            .observe_delivery_batch(started.elapsed().as_secs_f64());

        Ok(delivered)
    }
}

/// Pull the `type` tag out of a stored payload for metrics and logging.
/// Payloads are written by us, so a missing tag means a bug upstream; it is
/// labelled rather than treated as an error.
fn event_type_of(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(String::from))
        .unwrap_or_else(|| "unknown".to_string())
}

// ============================================================================
// Unit Tests
// ============================================================================
