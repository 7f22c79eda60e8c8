//! Event publisher
//!
//! `publish` snapshots records into an [`AuditBatch`] and queues it on an
//! unbounded channel; a consumer task drains the channel and hands each batch
//! to every registered handler exactly once, in registration order. The
//! caller returns as soon as the batch is queued.

use crate::handler::AuditHandler;
use crate::metrics;
use oplog_shared::{AuditBatch, AuditRecord, OplogError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cloneable handle to the publishing pipeline.
///
/// The consumer task ends once every clone is dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<AuditBatch>,
    sequence: Arc<AtomicU64>,
}

impl EventPublisher {
    /// Start the consumer task on the current tokio runtime.
    pub fn spawn(handlers: Vec<Arc<dyn AuditHandler>>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(deliver(handlers, rx));
        let publisher = Self {
            tx,
            sequence: Arc::new(AtomicU64::new(1)),
        };
        (publisher, consumer)
    }

    /// Queue `records` for delivery. Returns the batch sequence number.
    ///
    /// `None` or an empty vector is a programming error and fails with
    /// `InvalidArgument` without touching any handler.
    pub fn publish(&self, records: impl Into<Option<Vec<AuditRecord>>>) -> Result<u64> {
        let Some(records) = records.into().filter(|r| !r.is_empty()) else {
            metrics::PUBLISH_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(OplogError::InvalidArgument(
                "no audit records to publish".to_string(),
            ));
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let batch = AuditBatch::new(sequence, records)?;
        let count = batch.len();

        self.tx.send(batch).map_err(|_| {
            metrics::PUBLISH_TOTAL.with_label_values(&["closed"]).inc();
            OplogError::PublisherClosed
        })?;

        metrics::PUBLISH_TOTAL.with_label_values(&["ok"]).inc();
        debug!("Queued audit batch seq={} ({} records)", sequence, count);
        Ok(sequence)
    }
}

async fn deliver(handlers: Vec<Arc<dyn AuditHandler>>, mut rx: mpsc::UnboundedReceiver<AuditBatch>) {
    while let Some(batch) = rx.recv().await {
        for handler in &handlers {
            let started = Instant::now();
            let result = handler.handle(&batch).await;
            metrics::HANDLER_DURATION
                .with_label_values(&[handler.name()])
                .observe(started.elapsed().as_secs_f64());

            if let Err(e) = result {
                metrics::HANDLER_FAILURES
                    .with_label_values(&[handler.name()])
                    .inc();
                warn!(
                    "Handler {} failed on batch seq={}: {}",
                    handler.name(),
                    batch.sequence(),
                    e
                );
            }
        }
    }
    debug!("Audit publisher closed");
}
