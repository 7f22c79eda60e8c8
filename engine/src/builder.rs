//! Resolved descriptor -> audit record

use chrono::Utc;
use oplog_shared::{AuditRecord, OplogError, RequestMeta, Result};
use serde_json::Value;
use tracing::warn;

/// Descriptor after every template has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDescriptor {
    pub kind: String,
    pub sub_type: String,
    pub resource_id: String,
    pub operator: String,
    /// Action text on success, fail text otherwise
    pub content: String,
    pub extra: String,
    pub success: bool,
}

/// Decode a resolved `extra` template. Blank text means no payload.
pub fn decode_extra(text: &str) -> Result<Option<Value>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| OplogError::MalformedPayload {
            reason: e.to_string(),
        })
}

/// Build the record for one resolved descriptor.
///
/// The timestamp is taken here. A malformed `extra` payload is logged and the
/// record is emitted without it.
pub fn build_record(
    resolved: ResolvedDescriptor,
    method: &str,
    request: Option<&RequestMeta>,
) -> AuditRecord {
    let extra = match decode_extra(&resolved.extra) {
        Ok(extra) => extra,
        Err(e) => {
            warn!(
                "Dropping extra payload of {} record for {}: {}",
                resolved.kind, method, e
            );
            None
        }
    };

    AuditRecord {
        content: resolved.content,
        kind: resolved.kind,
        sub_type: resolved.sub_type,
        resource_id: resolved.resource_id,
        operator: resolved.operator,
        method: method.to_string(),
        created_at: Utc::now(),
        success: resolved.success,
        extra,
        request_method: request.map(|r| r.method.clone()),
        request_path: request.map(|r| r.path.clone()),
    }
}
