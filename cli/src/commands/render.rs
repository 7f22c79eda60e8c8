//! Render command - resolve one template outside any interceptor

use anyhow::Result;
use clap::Args;
use oplog_engine::{
    CallContext, ContextStack, Environment, FunctionCache, FunctionRegistry, TemplateParser,
};
use serde_json::Value;

use super::parse_binding;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Template text, e.g. "update user {upper{#name}}"
    pub template: String,

    /// Argument binding name=value (value read as JSON), repeatable
    #[arg(short, long = "arg", value_parser = parse_binding)]
    pub args: Vec<(String, Value)>,

    /// Context frame variable name=value, repeatable
    #[arg(long = "var", value_parser = parse_binding)]
    pub vars: Vec<(String, Value)>,

    /// Context global variable name=value, repeatable
    #[arg(long = "global", value_parser = parse_binding)]
    pub globals: Vec<(String, Value)>,

    /// Return value as JSON, visible as #@ret
    #[arg(long)]
    pub ret: Option<String>,

    /// Error text, visible as #@error
    #[arg(long)]
    pub error: Option<String>,
}

pub fn run(args: RenderArgs) -> Result<()> {
    println!("{}", render(&args)?);
    Ok(())
}

pub fn render(args: &RenderArgs) -> Result<String> {
    let mut call = CallContext::new("cli", "render");
    call.args = args.args.clone();
    call.return_value = args
        .ret
        .as_deref()
        .map(|raw| serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())));
    call.error = args.error.clone();

    let mut context = ContextStack::new();
    for (name, value) in &args.vars {
        context.set_frame_variable(name.clone(), value.clone());
    }
    for (name, value) in &args.globals {
        context.set_global_variable(name.clone(), value.clone());
    }

    let functions = FunctionRegistry::with_builtins();
    let env = Environment::after_call(&call, context);
    let mut cache = FunctionCache::new();
    Ok(TemplateParser::new(&functions).resolve(&args.template, &env, &mut cache)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(template: &str) -> RenderArgs {
        RenderArgs {
            template: template.to_string(),
            args: Vec::new(),
            vars: Vec::new(),
            globals: Vec::new(),
            ret: None,
            error: None,
        }
    }

    #[test]
    fn test_render_arguments_and_builtins() {
        let mut a = args("update user {{#userId}} as {upper{#name}}");
        a.args = vec![
            ("userId".to_string(), json!(42)),
            ("name".to_string(), json!("ada")),
        ];
        assert_eq!(render(&a).unwrap(), "update user 42 as ADA");
    }

    #[test]
    fn test_render_outcome_and_context() {
        let mut a = args("{{#@ret.id}} {{#@error}} {{#tenant}} {{#step}}");
        a.ret = Some("{\"id\": 7}".to_string());
        a.error = Some("boom".to_string());
        a.globals = vec![("tenant".to_string(), json!("acme"))];
        a.vars = vec![("step".to_string(), json!("one"))];
        assert_eq!(render(&a).unwrap(), "7 boom acme one");
    }

    #[test]
    fn test_render_unknown_function() {
        assert!(render(&args("{nope{#x}}")).is_err());
    }
}
