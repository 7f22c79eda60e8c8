//! Run command - push a scenario through a live pipeline
//!
//! A scenario is a JSON document:
//!
//! ```json
//! {
//!   "descriptors": [{ "type": "USER", "action": "update user {{#userId}}" }],
//!   "call": { "declaringType": "UserService", "method": "update", "args": [["userId", 42]] },
//!   "request": { "method": "PUT", "path": "/users/42" },
//!   "globals": { "traceId": "t-1" },
//!   "frame": { "before": "ada" },
//!   "outcome": { "ok": { "id": 42 } }
//! }
//! ```
//!
//! `frame` holds variables the business code writes while it runs.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use oplog_engine::{
    chain, metrics, AuditRecord, CallContext, ContextStack, EngineConfig, FunctionRegistry,
    HandlerKind, LogDescriptor, Pipeline, RequestMeta,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

use crate::output;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,

    /// Only print records of this type
    #[arg(short = 't', long = "type")]
    pub kind: Option<String>,

    /// Print Prometheus metrics after the records
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub descriptors: Vec<LogDescriptor>,
    pub call: CallContext,
    #[serde(default)]
    pub request: Option<RequestMeta>,
    #[serde(default)]
    pub globals: Map<String, Value>,
    #[serde(default)]
    pub frame: Map<String, Value>,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok(Value),
    Error(String),
}

pub async fn run(args: RunArgs, config: EngineConfig) -> Result<()> {
    let text = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&text).context("parsing scenario")?;

    let records = execute(scenario, config).await?;
    let records: Vec<_> = match &args.kind {
        Some(kind) => records.into_iter().filter(|r| &r.kind == kind).collect(),
        None => records,
    };

    println!("{}", serde_json::to_string_pretty(&records)?);
    output::success(&format!("{} record(s)", records.len()));

    if args.metrics {
        let text = metrics::encode_metrics().map_err(|e| anyhow!(e))?;
        print!("{}", text);
    }
    Ok(())
}

/// Run `scenario` once and return the records the memory handler received.
pub async fn execute(scenario: Scenario, mut config: EngineConfig) -> Result<Vec<AuditRecord>> {
    if !config.handlers.contains(&HandlerKind::Memory) {
        config.handlers.push(HandlerKind::Memory);
    }
    let pipeline = Pipeline::start(&config, FunctionRegistry::with_builtins())?;

    let Scenario {
        descriptors,
        call,
        request,
        globals,
        frame,
        outcome,
    } = scenario;
    info!(
        "Running {} with {} descriptor(s)",
        call.qualified_method(),
        descriptors.len()
    );

    let mut stack = ContextStack::new();
    for (name, value) in globals {
        stack.set_global_variable(name, value);
    }

    let out = chain::scope(
        stack,
        pipeline
            .interceptor
            .intercept(&descriptors, call, request, || async move {
                for (name, value) in frame {
                    chain::set_frame_variable(name, value).map_err(|e| e.to_string())?;
                }
                match outcome {
                    Outcome::Ok(value) => Ok(value),
                    Outcome::Error(message) => Err(message),
                }
            }),
    )
    .await;

    match &out.result {
        Ok(value) => output::info(&format!("Call returned {}", value)),
        Err(e) => output::info(&format!("Call failed: {}", e)),
    }
    if let Err(e) = &out.audit {
        output::warning(&format!("Audit failed: {}", e));
    }

    let memory = pipeline
        .shutdown()
        .await
        .context("memory handler missing from pipeline")?;
    memory
        .query(None, usize::MAX)
        .map_err(|e| anyhow!(e))
}
