//! Declarative log descriptors
//!
//! A descriptor is what a call site declares about the audit entry it wants:
//! every field except `kind` and `sub_type` is usually a template using the
//! `{func{expr}}` syntax and is resolved per call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogDescriptor {
    /// Audit category, e.g. `CRM-CUSTOMER`
    #[serde(rename = "type")]
    pub kind: String,

    /// CRUD sub-kind
    pub sub_type: String,

    /// Business key of the affected entity
    pub resource_id: String,

    /// Acting principal. Empty means "ask the operator source".
    pub operator: String,

    /// Human-readable description used when the call succeeded
    pub action: String,

    /// Description used when the call failed. Empty means no record on failure.
    pub fail: String,

    /// Optional serialized before/after payload (JSON once resolved)
    pub extra: String,

    /// Gate: when non-empty the record is only emitted if this resolves truthy
    pub condition: String,

    /// Overrides the "no error means success" rule when non-empty
    pub success_condition: String,
}

impl LogDescriptor {
    pub fn new(kind: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = sub_type.into();
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn with_fail(mut self, fail: impl Into<String>) -> Self {
        self.fail = fail.into();
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    pub fn with_success_condition(mut self, success_condition: impl Into<String>) -> Self {
        self.success_condition = success_condition.into();
        self
    }

    /// Templates that end up in the record, in declaration order.
    ///
    /// `condition` and `success_condition` are not included: they are
    /// resolved on their own before anything else.
    pub fn record_templates(&self) -> [&str; 7] {
        [
            self.kind.as_str(),
            self.sub_type.as_str(),
            self.resource_id.as_str(),
            self.operator.as_str(),
            self.action.as_str(),
            self.fail.as_str(),
            self.extra.as_str(),
        ]
    }

    /// Every template of the descriptor, gates first.
    pub fn all_templates(&self) -> impl Iterator<Item = &str> {
        [self.condition.as_str(), self.success_condition.as_str()]
            .into_iter()
            .chain(self.record_templates())
            .filter(|t| !t.is_empty())
    }
}
