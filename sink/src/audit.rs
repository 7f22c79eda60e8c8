//! Tracing handler
//!
//! Every delivered record is emitted via `tracing` on a dedicated target so
//! it can be filtered and formatted (e.g. JSON) for downstream audit pipelines.

use crate::handler::AuditHandler;
use async_trait::async_trait;
use oplog_shared::{AuditBatch, AuditRecord};
use tracing::{info, warn};

pub const AUDIT_TARGET: &str = "oplog::audit";

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHandler;

impl TracingHandler {
    pub fn new() -> Self {
        Self
    }
}

fn emit(sequence: u64, record: &AuditRecord) {
    let extra = record
        .extra
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default();
    let request = match (&record.request_method, &record.request_path) {
        (Some(m), Some(p)) => format!("{} {}", m, p),
        _ => String::new(),
    };

    if record.success {
        info!(
            target: AUDIT_TARGET,
            sequence,
            kind = %record.kind,
            sub_type = %record.sub_type,
            resource_id = %record.resource_id,
            operator = %record.operator,
            method = %record.method,
            created_at = %record.created_at.to_rfc3339(),
            result = "ok",
            extra = %extra,
            request = %request,
            "{}",
            record.content
        );
    } else {
        warn!(
            target: AUDIT_TARGET,
            sequence,
            kind = %record.kind,
            sub_type = %record.sub_type,
            resource_id = %record.resource_id,
            operator = %record.operator,
            method = %record.method,
            created_at = %record.created_at.to_rfc3339(),
            result = "failed",
            extra = %extra,
            request = %request,
            "{}",
            record.content
        );
    }
}

#[async_trait]
impl AuditHandler for TracingHandler {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn handle(&self, batch: &AuditBatch) -> Result<(), String> {
        for record in batch {
            emit(batch.sequence(), record);
        }
        Ok(())
    }
}
