//! Audit records and the batches published to handlers

use crate::error::{OplogError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Final, resolved audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Resolved action (or fail) text
    pub content: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub sub_type: String,

    pub resource_id: String,

    pub operator: String,

    /// `Type::method` of the intercepted call
    pub method: String,

    /// Assigned once, when the record is built
    pub created_at: DateTime<Utc>,

    pub success: bool,

    /// Decoded before/after payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
}

/// Immutable, ordered, non-empty group of records handed to handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBatch")]
pub struct AuditBatch {
    sequence: u64,
    records: Arc<[AuditRecord]>,
}

/// Wire shape of a batch before the non-empty check.
#[derive(Deserialize)]
struct RawBatch {
    sequence: u64,
    records: Vec<AuditRecord>,
}

impl TryFrom<RawBatch> for AuditBatch {
    type Error = OplogError;

    fn try_from(raw: RawBatch) -> Result<Self> {
        AuditBatch::new(raw.sequence, raw.records)
    }
}

impl AuditBatch {
    /// Snapshot `records` into a batch. Fails on an empty sequence.
    pub fn new(sequence: u64, records: Vec<AuditRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(OplogError::InvalidArgument(
                "audit batch must contain at least one record".to_string(),
            ));
        }
        Ok(Self {
            sequence,
            records: records.into(),
        })
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed batch; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a AuditBatch {
    type Item = &'a AuditRecord;
    type IntoIter = std::slice::Iter<'a, AuditRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> AuditRecord {
        AuditRecord {
            content: content.to_string(),
            kind: "USER".to_string(),
            sub_type: String::new(),
            resource_id: "42".to_string(),
            operator: "alice".to_string(),
            method: "UserService::update".to_string(),
            created_at: Utc::now(),
            success: true,
            extra: None,
            request_method: None,
            request_path: None,
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = AuditBatch::new(1, Vec::new()).unwrap_err();
        assert!(matches!(err, OplogError::InvalidArgument(_)));
    }

    #[test]
    fn test_batch_keeps_order() {
        let batch = AuditBatch::new(7, vec![record("a"), record("b")]).unwrap();
        assert_eq!(batch.sequence(), 7);
        let contents: Vec<_> = batch.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["a", "b"]);
    }

    #[test]
    fn test_deserialize_checks_non_empty() {
        let err = serde_json::from_str::<AuditBatch>(r#"{"sequence":1,"records":[]}"#).unwrap_err();
        assert!(err.to_string().contains("at least one record"));

        let batch = AuditBatch::new(4, vec![record("a")]).unwrap();
        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(serde_json::from_str::<AuditBatch>(&json).unwrap(), batch);
    }

    #[test]
    fn test_record_json_shape() {
        let json = serde_json::to_value(record("updated")).unwrap();
        assert_eq!(json["type"], "USER");
        assert_eq!(json["resourceId"], "42");
        assert!(json.get("extra").is_none());
        assert!(json.get("requestPath").is_none());
    }
}
