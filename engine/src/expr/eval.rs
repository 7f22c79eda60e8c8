//! Tree-walking evaluator

use super::parser::{BinaryOp, Expr};
use super::{stringify, truthy};
use serde_json::Value;
use std::cmp::Ordering;

/// Variable source an expression is evaluated against.
pub trait Scope {
    /// Value bound to `name` (`@ret`/`@error` for the reserved variables).
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Scope for std::collections::HashMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Evaluate `expr`. Evaluation itself cannot fail: anything unresolvable is `null`.
pub fn evaluate<S: Scope + ?Sized>(expr: &Expr, scope: &S) -> Value {
    match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Variable(name) => scope.lookup(name).unwrap_or(Value::Null),
        Expr::Member(target, name) => match evaluate(target, scope) {
            Value::Object(mut map) => map.remove(name).unwrap_or(Value::Null),
            _ => Value::Null,
        },
        Expr::Index(target, index) => {
            let target = evaluate(target, scope);
            let index = evaluate(index, scope);
            index_value(target, &index)
        }
        Expr::Not(inner) => Value::Bool(!truthy(&evaluate(inner, scope))),
        Expr::Binary(BinaryOp::And, left, right) => {
            let left = evaluate(left, scope);
            if !truthy(&left) {
                return Value::Bool(false);
            }
            Value::Bool(truthy(&evaluate(right, scope)))
        }
        Expr::Binary(BinaryOp::Or, left, right) => {
            let left = evaluate(left, scope);
            if truthy(&left) {
                return Value::Bool(true);
            }
            Value::Bool(truthy(&evaluate(right, scope)))
        }
        Expr::Binary(op, left, right) => {
            let left = evaluate(left, scope);
            let right = evaluate(right, scope);
            binary(*op, &left, &right)
        }
    }
}

fn index_value(target: Value, index: &Value) -> Value {
    match (target, index) {
        (Value::Array(mut items), Value::Number(n)) => match n.as_u64() {
            Some(i) if (i as usize) < items.len() => items.swap_remove(i as usize),
            _ => Value::Null,
        },
        (Value::Object(mut map), Value::String(key)) => map.remove(key).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Equal => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEqual => Value::Bool(!loose_eq(left, right)),
        BinaryOp::LessThan => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LessThanOrEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::GreaterThan => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GreaterThanOrEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Add => add(left, right),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators handled in evaluate"),
    }
}

/// Equality with numbers compared by value, so `1 == 1.0`.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn add(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x
                .checked_add(y)
                .map(Value::from)
                .unwrap_or_else(|| Value::from(x as f64 + y as f64)),
            _ => Value::from(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0)),
        },
        (Value::Null, Value::Null) => Value::Null,
        _ => Value::String(format!("{}{}", stringify(left), stringify(right))),
    }
}
