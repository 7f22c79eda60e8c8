//! Variable environment for one intercepted call
//!
//! Lookup precedence, highest first:
//! 1. `@ret` - the serialized return value
//! 2. `@error` - the error text
//! 3. call arguments, by declared name
//! 4. top frame of the context stack
//! 5. context globals
//!
//! `@` cannot start an argument name or an expression identifier, so the
//! reserved variables never collide with user-chosen names.

use crate::context::ContextStack;
use crate::expr::Scope;
use oplog_shared::CallContext;
use serde_json::Value;

pub const RETURN_VARIABLE: &str = "@ret";
pub const ERROR_VARIABLE: &str = "@error";

#[derive(Debug, Clone)]
pub struct Environment<'a> {
    call: &'a CallContext,
    context: ContextStack,
    outcome_visible: bool,
}

impl<'a> Environment<'a> {
    /// Environment for templates resolved after the call completed.
    pub fn after_call(call: &'a CallContext, context: ContextStack) -> Self {
        Self {
            call,
            context,
            outcome_visible: true,
        }
    }

    /// Environment for the before pass: the outcome does not exist yet, so
    /// `@ret` and `@error` are unbound even if the call context carries them.
    pub fn before_call(call: &'a CallContext, context: ContextStack) -> Self {
        Self {
            call,
            context,
            outcome_visible: false,
        }
    }

    pub fn call(&self) -> &CallContext {
        self.call
    }

    pub fn context(&self) -> &ContextStack {
        &self.context
    }
}

impl Scope for Environment<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match name {
            RETURN_VARIABLE if self.outcome_visible => self.call.return_value.clone(),
            ERROR_VARIABLE if self.outcome_visible => self.call.error.clone().map(Value::String),
            RETURN_VARIABLE | ERROR_VARIABLE => None,
            _ => self
                .call
                .argument(name)
                .or_else(|| self.context.get_variable(name))
                .cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> CallContext {
        let mut call = CallContext::new("UserService", "update")
            .arg("userId", "42")
            .arg("shared", "from-arg");
        call.return_value = Some(json!({"id": 42}));
        call.error = Some("boom".to_string());
        call
    }

    #[test]
    fn test_precedence() {
        let call = call();
        let mut stack = ContextStack::new();
        stack.set_global_variable("shared", "from-global");
        stack.set_global_variable("onlyGlobal", "g");
        stack.set_global_variable("layered", "global");
        stack.set_frame_variable("layered", "frame");

        let env = Environment::after_call(&call, stack);
        assert_eq!(env.lookup("shared"), Some(json!("from-arg")));
        assert_eq!(env.lookup("layered"), Some(json!("frame")));
        assert_eq!(env.lookup("onlyGlobal"), Some(json!("g")));
        assert_eq!(env.lookup("@ret"), Some(json!({"id": 42})));
        assert_eq!(env.lookup("@error"), Some(json!("boom")));
        assert_eq!(env.lookup("missing"), None);
    }

    #[test]
    fn test_context_cannot_shadow_reserved() {
        let call = call();
        let mut stack = ContextStack::new();
        stack.set_frame_variable("@ret", "spoofed");
        let env = Environment::after_call(&call, stack);
        assert_eq!(env.lookup("@ret"), Some(json!({"id": 42})));
    }

    #[test]
    fn test_before_call_hides_outcome() {
        let call = call();
        let env = Environment::before_call(&call, ContextStack::new());
        assert_eq!(env.lookup("@ret"), None);
        assert_eq!(env.lookup("@error"), None);
        assert_eq!(env.lookup("userId"), Some(json!("42")));
    }
}
