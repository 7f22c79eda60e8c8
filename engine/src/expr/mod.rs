//! Embedded expression language
//!
//! Expressions are what sits inside `{func{...}}`. They read variables
//! (`#name`, `#@ret`, `#@error`), navigate JSON values (`.field`, `[0]`,
//! `['key']`) and combine them with a handful of operators:
//!
//! | precedence | operators            |
//! |------------|----------------------|
//! | lowest     | `\|\|`               |
//! |            | `&&`                 |
//! |            | `==` `!=`            |
//! |            | `<` `<=` `>` `>=`    |
//! |            | `+`                  |
//! | highest    | unary `!`, `( )`     |
//!
//! A missing variable or field evaluates to `null`, never to an error.

mod eval;
mod lexer;
mod parser;

pub use eval::{evaluate, Scope};
pub use parser::{parse, BinaryOp, Expr};

use serde_json::Value;

/// Text substituted into a template for `value`.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truthiness used by `!`, `&&`, `||` and the record gates.
///
/// False: null, `false`, any zero, `""` and the text `false` in any case.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
        Value::Array(_) | Value::Object(_) => true,
    }
}
