//! Handler abstraction

use async_trait::async_trait;
use oplog_shared::AuditBatch;

/// Consumer of published audit batches (storage, forwarding, ...).
///
/// Failures are the handler's own concern: the publisher logs and counts an
/// `Err`, it never retries.
#[async_trait]
pub trait AuditHandler: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Accept one batch for durable storage.
    async fn handle(&self, batch: &AuditBatch) -> Result<(), String>;
}
