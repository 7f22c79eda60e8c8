//! Per-pass function result cache
//!
//! Keys are the function name concatenated with the raw expression text, so
//! the same call site always maps to the same key in every pass. An entry is
//! written once and never replaced for the lifetime of the cache.

use crate::expr::stringify;
use serde_json::Value;
use std::collections::HashMap;

pub fn cache_key(function: &str, expression: &str) -> String {
    let mut key = String::with_capacity(function.len() + expression.len());
    key.push_str(function);
    key.push_str(expression);
    key
}

#[derive(Debug, Clone, Default)]
pub struct FunctionCache {
    entries: HashMap<String, String>,
}

impl FunctionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text for one `{function{expression}}` occurrence.
    ///
    /// Without a function name the evaluated value is returned as text and the
    /// cache is not consulted. Otherwise a registered result is returned
    /// verbatim; on a miss the key itself comes back as a placeholder for the
    /// caller to register a real value under.
    pub fn resolve(&self, raw: &Value, expression: &str, function: &str) -> String {
        if function.is_empty() {
            return stringify(raw);
        }
        let key = cache_key(function, expression);
        match self.entries.get(&key) {
            Some(hit) => hit.clone(),
            None => key,
        }
    }

    /// Record `value` under `key`. Returns false, leaving the entry untouched,
    /// if the key was already registered.
    pub fn register(&mut self, key: String, value: String) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_expression_bypasses_cache() {
        let mut cache = FunctionCache::new();
        cache.register(cache_key("", "#id"), "cached".to_string());
        assert_eq!(cache.resolve(&json!(5), "#id", ""), "5");
        assert_eq!(cache.resolve(&Value::Null, "#id", ""), "");
    }

    #[test]
    fn test_miss_returns_key_placeholder() {
        let cache = FunctionCache::new();
        assert_eq!(cache.resolve(&json!("42"), "#userId", "user"), "user#userId");
    }

    #[test]
    fn test_hit_is_verbatim() {
        let mut cache = FunctionCache::new();
        assert!(cache.register(cache_key("user", "#userId"), "Ada".to_string()));
        assert_eq!(cache.resolve(&json!("other"), "#userId", "user"), "Ada");
    }

    #[test]
    fn test_register_never_overwrites() {
        let mut cache = FunctionCache::new();
        assert!(cache.register("k".to_string(), "first".to_string()));
        assert!(!cache.register("k".to_string(), "second".to_string()));
        assert_eq!(cache.get("k"), Some("first"));
        assert_eq!(cache.len(), 1);
    }
}
