//! Template resolution
//!
//! A template is free text with embedded `{func{expression}}` occurrences;
//! the function name is optional (`{{#id}}`). Occurrences are resolved left
//! to right and substituted in place. Templates without `{` are returned as
//! they are.
//!
//! An occurrence ends at the first `}}` outside a quoted string literal, so
//! `{{'a}}b'}}` reads the expression `'a}}b'`. If the quotes never close, the
//! first `}}` ends it and the expression fails to parse.

use crate::cache::{cache_key, FunctionCache};
use crate::expr::{self, Scope};
use crate::function::FunctionRegistry;
use once_cell::sync::Lazy;
use oplog_shared::Result;
use regex::Regex;
use std::collections::HashMap;
use tracing::trace;

/// Opening half of an occurrence: `{`, optional function name, `{`.
static OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*(\w*)\s*\{").expect("template pattern is valid"));

/// One `{func{expression}}` occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder<'t> {
    pub function: &'t str,
    pub expression: &'t str,
}

/// A placeholder plus the byte range it covers in its template.
struct Occurrence<'t> {
    start: usize,
    end: usize,
    placeholder: Placeholder<'t>,
}

/// Offset of the `}}` closing an expression body, skipping quoted literals.
fn closing_braces(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => {
                i += 2;
                continue;
            }
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'\'' || b == b'"' => quote = Some(b),
            None if b == b'}' && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn occurrences(template: &str) -> Vec<Occurrence<'_>> {
    let mut found = Vec::new();
    let mut pos = 0;
    while pos < template.len() {
        let rest = &template[pos..];
        let Some(caps) = OPEN.captures(rest) else {
            break;
        };
        let Some(open) = caps.get(0) else {
            break;
        };
        let body = &rest[open.end()..];
        let Some(len) = closing_braces(body).or_else(|| body.find("}}")) else {
            pos += open.start() + 1;
            continue;
        };

        let end = pos + open.end() + len + 2;
        found.push(Occurrence {
            start: pos + open.start(),
            end,
            placeholder: Placeholder {
                function: caps.get(1).map_or("", |m| m.as_str()),
                expression: &body[..len],
            },
        });
        pos = end;
    }
    found
}

/// All placeholders of `template`, in scan order.
pub fn placeholders(template: &str) -> Vec<Placeholder<'_>> {
    if !template.contains('{') {
        return Vec::new();
    }
    occurrences(template)
        .into_iter()
        .map(|o| o.placeholder)
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct TemplateParser<'r> {
    functions: &'r FunctionRegistry,
}

impl<'r> TemplateParser<'r> {
    pub fn new(functions: &'r FunctionRegistry) -> Self {
        Self { functions }
    }

    /// Resolve every template, in the order given. Duplicates resolve once.
    pub fn resolve_all<'t, S, I>(
        &self,
        templates: I,
        scope: &S,
        cache: &mut FunctionCache,
    ) -> Result<HashMap<String, String>>
    where
        S: Scope + ?Sized,
        I: IntoIterator<Item = &'t str>,
    {
        let mut resolved = HashMap::new();
        for template in templates {
            if resolved.contains_key(template) {
                continue;
            }
            let text = self.resolve(template, scope, cache)?;
            resolved.insert(template.to_string(), text);
        }
        Ok(resolved)
    }

    /// Resolve one template.
    pub fn resolve<S: Scope + ?Sized>(
        &self,
        template: &str,
        scope: &S,
        cache: &mut FunctionCache,
    ) -> Result<String> {
        if !template.contains('{') {
            return Ok(template.to_string());
        }

        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for o in occurrences(template) {
            let Placeholder {
                function,
                expression,
            } = o.placeholder;
            out.push_str(&template[last..o.start]);
            out.push_str(&self.substitute(function, expression, scope, cache)?);
            last = o.end;
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn substitute<S: Scope + ?Sized>(
        &self,
        function: &str,
        expression: &str,
        scope: &S,
        cache: &mut FunctionCache,
    ) -> Result<String> {
        let raw = expr::evaluate(&expr::parse(expression)?, scope);
        let key = cache_key(function, expression);
        if function.is_empty() || cache.contains(&key) {
            return Ok(cache.resolve(&raw, expression, function));
        }

        let text = self.functions.get(function)?.apply(&raw)?;
        trace!("Resolved {}{{{}}} -> {:?}", function, expression, text);
        cache.register(key, text.clone());
        Ok(text)
    }

    /// Before pass: run every before-call function referenced by `templates`
    /// and register its result, so the after pass substitutes it verbatim.
    /// Returns the number of results registered.
    pub fn prefetch<'t, S, I>(
        &self,
        templates: I,
        scope: &S,
        cache: &mut FunctionCache,
    ) -> Result<usize>
    where
        S: Scope + ?Sized,
        I: IntoIterator<Item = &'t str>,
    {
        let mut registered = 0;
        for template in templates {
            for p in placeholders(template) {
                if p.function.is_empty() || !self.functions.is_before(p.function) {
                    continue;
                }
                let key = cache_key(p.function, p.expression);
                if cache.contains(&key) {
                    continue;
                }
                let raw = expr::evaluate(&expr::parse(p.expression)?, scope);
                let text = self.functions.get(p.function)?.apply(&raw)?;
                trace!("Prefetched {} -> {:?}", key, text);
                cache.register(key, text);
                registered += 1;
            }
        }
        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnResolver;
    use oplog_shared::OplogError;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn scope() -> HashMap<String, Value> {
        let mut vars = HashMap::new();
        vars.insert("userId".to_string(), json!("42"));
        vars.insert("name".to_string(), json!("ada"));
        vars
    }

    #[test]
    fn test_passthrough() {
        let registry = FunctionRegistry::new();
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();
        let text = parser
            .resolve("no placeholders here } #userId", &scope(), &mut cache)
            .unwrap();
        assert_eq!(text, "no placeholders here } #userId");
    }

    #[test]
    fn test_plain_substitution() {
        let registry = FunctionRegistry::new();
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();
        let text = parser
            .resolve("update user {{#userId}} ({{#missing}}) done", &scope(), &mut cache)
            .unwrap();
        assert_eq!(text, "update user 42 () done");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_function_and_whitespace() {
        let registry = FunctionRegistry::with_builtins();
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();
        let text = parser
            .resolve("{ upper {#name}} / {lower{'X' + #userId}}", &scope(), &mut cache)
            .unwrap();
        assert_eq!(text, "ADA / x42");
    }

    #[test]
    fn test_function_runs_once_per_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = FunctionRegistry::new();
        registry.register(FnResolver::new("f", move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<{}>", crate::expr::stringify(v)))
        }));
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();

        let resolved = parser
            .resolve_all(["{f{#userId}}", "id={f{#userId}}"], &scope(), &mut cache)
            .unwrap();

        assert_eq!(resolved["{f{#userId}}"], "<42>");
        assert_eq!(resolved["id={f{#userId}}"], "id=<42>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prefetched_value_wins() {
        let mut registry = FunctionRegistry::new();
        registry.register(
            FnResolver::new("current", |v| Ok(format!("db:{}", crate::expr::stringify(v))))
                .before_call(),
        );
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();

        let before = scope();
        let n = parser
            .prefetch(["old={current{#name}}"], &before, &mut cache)
            .unwrap();
        assert_eq!(n, 1);

        let mut after = scope();
        after.insert("name".to_string(), json!("grace"));
        let text = parser
            .resolve("old={current{#name}}", &after, &mut cache)
            .unwrap();
        assert_eq!(text, "old=db:ada");
    }

    #[test]
    fn test_errors_propagate() {
        let mut registry = FunctionRegistry::new();
        registry.register(FnResolver::new("boom", |_| {
            Err(OplogError::resolver("boom", "lookup failed"))
        }));
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();

        assert!(matches!(
            parser.resolve("{boom{#userId}}", &scope(), &mut cache),
            Err(OplogError::Resolver { .. })
        ));
        assert!(matches!(
            parser.resolve("{nope{#userId}}", &scope(), &mut cache),
            Err(OplogError::UnknownFunction(_))
        ));
        assert!(matches!(
            parser.resolve("{{#userId +}}", &scope(), &mut cache),
            Err(OplogError::Expression { .. })
        ));
    }

    #[test]
    fn test_closing_braces_inside_quotes() {
        let registry = FunctionRegistry::new();
        let parser = TemplateParser::new(&registry);
        let mut cache = FunctionCache::new();
        let text = parser
            .resolve("x {{'a}}b'}} y {{\"c}}\" + #userId}}", &scope(), &mut cache)
            .unwrap();
        assert_eq!(text, "x a}}b y c}}42");

        assert!(matches!(
            parser.resolve("{{'open}} tail", &scope(), &mut cache),
            Err(OplogError::Expression { .. })
        ));
    }

    #[test]
    fn test_placeholders() {
        let found = placeholders("a {f{#x}} b {{#y.z}}");
        assert_eq!(
            found,
            vec![
                Placeholder { function: "f", expression: "#x" },
                Placeholder { function: "", expression: "#y.z" },
            ]
        );
        assert!(placeholders("plain").is_empty());
    }
}
