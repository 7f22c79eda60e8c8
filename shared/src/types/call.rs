//! Intercepted call metadata
//!
//! Parameter names are supplied by whoever builds the `CallContext`; nothing
//! is discovered at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallContext {
    /// Type (or module) declaring the intercepted method
    pub declaring_type: String,

    /// Method identity
    pub method: String,

    /// Ordered `(parameter name, value)` bindings
    pub args: Vec<(String, Value)>,

    /// Serialized return value, once the call completed successfully
    pub return_value: Option<Value>,

    /// Error text, once the call failed
    pub error: Option<String>,
}

impl CallContext {
    pub fn new(declaring_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            method: method.into(),
            ..Default::default()
        }
    }

    /// Append an argument binding.
    pub fn arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    /// Value bound to parameter `name`. A later binding with the same name wins.
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// `Type::method`, used as the record's method identity.
    pub fn qualified_method(&self) -> String {
        if self.declaring_type.is_empty() {
            self.method.clone()
        } else {
            format!("{}::{}", self.declaring_type, self.method)
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Request metadata carried through to the record as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}
