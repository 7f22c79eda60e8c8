//! Resolver functions
//!
//! A resolver post-processes the value of the expression it wraps, e.g.
//! `{userName{#userId}}` turns an id into a display name. Resolvers are
//! registered once at startup in a [`FunctionRegistry`].

use oplog_shared::{OplogError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub trait ResolverFunction: Send + Sync {
    fn name(&self) -> &str;

    /// Run in the before pass, against the arguments as they were before the
    /// call (e.g. "load the current DB value"). The result is reused verbatim
    /// by the after pass.
    fn execute_before(&self) -> bool {
        false
    }

    fn apply(&self, value: &Value) -> Result<String>;
}

type ResolverFn = dyn Fn(&Value) -> Result<String> + Send + Sync;

/// Closure-backed resolver.
pub struct FnResolver {
    name: String,
    before: bool,
    f: Box<ResolverFn>,
}

impl FnResolver {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            before: false,
            f: Box::new(f),
        }
    }

    /// Mark the resolver as a before-call function.
    pub fn before_call(mut self) -> Self {
        self.before = true;
        self
    }
}

impl fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver")
            .field("name", &self.name)
            .field("before", &self.before)
            .finish()
    }
}

impl ResolverFunction for FnResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute_before(&self) -> bool {
        self.before
    }

    fn apply(&self, value: &Value) -> Result<String> {
        (self.f)(value)
    }
}

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ResolverFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `upper`, `lower`, `trim` and `json`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FnResolver::new("upper", |v| {
            Ok(crate::expr::stringify(v).to_uppercase())
        }));
        registry.register(FnResolver::new("lower", |v| {
            Ok(crate::expr::stringify(v).to_lowercase())
        }));
        registry.register(FnResolver::new("trim", |v| {
            Ok(crate::expr::stringify(v).trim().to_string())
        }));
        registry.register(FnResolver::new("json", |v| {
            serde_json::to_string(v).map_err(|e| OplogError::resolver("json", e))
        }));
        registry
    }

    /// Add `function`, replacing any previous one with the same name.
    pub fn register(&mut self, function: impl ResolverFunction + 'static) -> &mut Self {
        self.functions
            .insert(function.name().to_string(), Arc::new(function));
        self
    }

    pub fn get(&self, name: &str) -> Result<&Arc<dyn ResolverFunction>> {
        self.functions
            .get(name)
            .ok_or_else(|| OplogError::UnknownFunction(name.to_string()))
    }

    pub fn is_before(&self, name: &str) -> bool {
        self.functions
            .get(name)
            .map(|f| f.execute_before())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins() {
        let registry = FunctionRegistry::with_builtins();
        let upper = registry.get("upper").unwrap();
        assert_eq!(upper.apply(&json!("ada")).unwrap(), "ADA");
        let json_fn = registry.get("json").unwrap();
        assert_eq!(json_fn.apply(&json!("ada")).unwrap(), "\"ada\"");
        assert!(!registry.is_before("upper"));
    }

    #[test]
    fn test_unknown_function() {
        let registry = FunctionRegistry::new();
        assert!(matches!(
            registry.get("nope"),
            Err(OplogError::UnknownFunction(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_before_flag() {
        let mut registry = FunctionRegistry::new();
        registry.register(FnResolver::new("oldName", |_| Ok("old".to_string())).before_call());
        assert!(registry.is_before("oldName"));
        assert!(!registry.is_before("missing"));
    }
}
