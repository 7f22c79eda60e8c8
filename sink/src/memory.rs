//! In-memory handler keeping the most recent records

use crate::handler::AuditHandler;
use async_trait::async_trait;
use oplog_shared::{AuditBatch, AuditRecord};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Bounded ring buffer of delivered records. Thread-safe.
#[derive(Debug)]
pub struct InMemoryHandler {
    max_records: usize,
    records: RwLock<VecDeque<AuditRecord>>,
}

impl InMemoryHandler {
    /// Create a handler that keeps at most `max_records` records.
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            records: RwLock::new(VecDeque::with_capacity(max_records.min(4096))),
        }
    }

    /// Append every record of `batch`, evicting the oldest when at capacity.
    pub fn push(&self, batch: &AuditBatch) -> Result<(), String> {
        let mut records = self.records.write().map_err(|e| e.to_string())?;
        records.extend(batch.iter().cloned());
        let mut drops = 0u64;
        while records.len() > self.max_records {
            records.pop_front();
            drops += 1;
        }

        crate::metrics::BUFFER_SIZE.set(records.len() as f64);
        if drops > 0 {
            crate::metrics::BUFFER_DROPS.inc_by(drops as f64);
        }

        Ok(())
    }

    /// Most recent records (oldest first), optionally filtered by type.
    pub fn query(&self, kind_filter: Option<&str>, limit: usize) -> Result<Vec<AuditRecord>, String> {
        let records = self.records.read().map_err(|e| e.to_string())?;
        let mut out = Vec::with_capacity(limit.min(records.len()));

        for r in records.iter().rev() {
            if out.len() >= limit {
                break;
            }
            if let Some(kind) = kind_filter {
                if r.kind != kind {
                    continue;
                }
            }
            out.push(r.clone());
        }
        out.reverse();
        Ok(out)
    }

    /// Current number of records held.
    pub fn len(&self) -> Result<usize, String> {
        let records = self.records.read().map_err(|e| e.to_string())?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len().map(|n| n == 0).unwrap_or(true)
    }

    /// Buffer utilization as a fraction (0.0 to 1.0).
    pub fn utilization(&self) -> f64 {
        let len = self.len().unwrap_or(0);
        if self.max_records == 0 {
            return 0.0;
        }
        len as f64 / self.max_records as f64
    }
}

#[async_trait]
impl AuditHandler for InMemoryHandler {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn handle(&self, batch: &AuditBatch) -> Result<(), String> {
        self.push(batch)
    }
}
