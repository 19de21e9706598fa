//! Background delivery of order events.

use std::time::Duration;

use domain::OrderEvent;
use tokio::sync::mpsc;

use crate::notifier::Notifier;

/// Retry policy of a [`NotificationWorker`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Attempts per event, the first one included.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// Counts reported when the worker stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Drains the event channel and delivers each event.
///
/// Runs until every publisher is dropped and the buffered events are
/// delivered.
pub struct NotificationWorker<N: Notifier> {
    receiver: mpsc::Receiver<OrderEvent>,
    notifier: N,
    config: WorkerConfig,
}

impl<N: Notifier> NotificationWorker<N> {
    pub fn new(receiver: mpsc::Receiver<OrderEvent>, notifier: N) -> Self {
        Self::with_config(receiver, notifier, WorkerConfig::default())
    }

    pub fn with_config(
        receiver: mpsc::Receiver<OrderEvent>,
        notifier: N,
        config: WorkerConfig,
    ) -> Self {
        Self {
            receiver,
            notifier,
            config,
        }
    }

    pub async fn run(mut self) -> WorkerStats {
        tracing::info!("notification worker started");
        let mut stats = WorkerStats::default();

        while let Some(event) = self.receiver.recv().await {
            if self.deliver(&event).await {
                stats.delivered += 1;
            } else {
                stats.failed += 1;
            }
        }

        tracing::info!(
            delivered = stats.delivered,
            failed = stats.failed,
            "notification worker stopped"
        );
        stats
    }

    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type()))]
    async fn deliver(&self, event: &OrderEvent) -> bool {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.notifier.notify(event).await {
                Ok(()) => {
                    metrics::counter!("notifications_delivered_total").increment(1);
                    return true;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, error = %e, "notification attempt failed, retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "notification dropped");
                }
            }
        }

        metrics::counter!("notifications_failed_total", "reason" => "delivery").increment(1);
        false
    }
}
