//! Decorator wrapping an audited call
//!
//! [`Interceptor::intercept`] runs the whole recording flow around a business
//! call: push a context frame, run the before pass, invoke the call, capture
//! its outcome, resolve every descriptor, publish the records, pop the frame.
//!
//! Recording never alters the business outcome: it is returned untouched in
//! [`Intercepted::result`], next to the recording outcome.

use crate::builder::{build_record, ResolvedDescriptor};
use crate::cache::FunctionCache;
use crate::chain;
use crate::context::ContextStack;
use crate::environment::Environment;
use crate::expr;
use crate::function::FunctionRegistry;
use crate::template::TemplateParser;
use oplog_shared::{AuditRecord, CallContext, LogDescriptor, RequestMeta, Result};
use oplog_sink::metrics;
use oplog_sink::EventPublisher;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// Supplies the operator when a descriptor's operator template is empty.
pub trait OperatorSource: Send + Sync {
    fn current_operator(&self) -> String;
}

impl<F> OperatorSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn current_operator(&self) -> String {
        self()
    }
}

#[derive(Debug, Clone)]
pub struct StaticOperator(String);

impl StaticOperator {
    pub fn new(operator: impl Into<String>) -> Self {
        Self(operator.into())
    }
}

impl OperatorSource for StaticOperator {
    fn current_operator(&self) -> String {
        self.0.clone()
    }
}

/// Outcome of an intercepted call.
#[derive(Debug)]
pub struct Intercepted<T, E> {
    /// What the business call returned
    pub result: Result<T, E>,
    /// Number of records published, or why recording failed
    pub audit: Result<usize>,
}

/// Truthiness of a resolved `condition` / `success_condition`. Numeric text
/// is judged as a number, so `0` and `0.0` are both false.
fn resolved_truthy(text: &str) -> bool {
    let text = text.trim();
    match text.parse::<f64>() {
        Ok(n) => n != 0.0,
        Err(_) => expr::truthy(&Value::String(text.to_string())),
    }
}

#[derive(Clone)]
pub struct Interceptor {
    functions: Arc<FunctionRegistry>,
    publisher: EventPublisher,
    operators: Arc<dyn OperatorSource>,
}

impl Interceptor {
    pub fn new(functions: FunctionRegistry, publisher: EventPublisher) -> Self {
        Self {
            functions: Arc::new(functions),
            publisher,
            operators: Arc::new(StaticOperator::new("system")),
        }
    }

    pub fn with_operator_source(mut self, source: impl OperatorSource + 'static) -> Self {
        self.operators = Arc::new(source);
        self
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Run `f` as an audited call described by `descriptors`.
    ///
    /// Joins the current call chain, or opens a fresh one when called outside
    /// any chain.
    pub async fn intercept<F, Fut, T, E>(
        &self,
        descriptors: &[LogDescriptor],
        call: CallContext,
        request: Option<RequestMeta>,
        f: F,
    ) -> Intercepted<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        if chain::is_active() {
            self.run(descriptors, call, request, f).await
        } else {
            chain::scope(ContextStack::new(), self.run(descriptors, call, request, f)).await
        }
    }

    async fn run<F, Fut, T, E>(
        &self,
        descriptors: &[LogDescriptor],
        mut call: CallContext,
        request: Option<RequestMeta>,
        f: F,
    ) -> Intercepted<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        let _frame = chain::FrameGuard::push().ok();
        let mut cache = FunctionCache::new();

        let prefetched = {
            let env = Environment::before_call(&call, chain::snapshot().unwrap_or_default());
            let templates = descriptors.iter().flat_map(|d| d.all_templates());
            TemplateParser::new(&self.functions).prefetch(templates, &env, &mut cache)
        };

        let result = f().await;
        match &result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(v) => call.return_value = Some(v),
                Err(e) => debug!("Return value of {} not serializable: {}", call.method, e),
            },
            Err(e) => call.error = Some(e.to_string()),
        }

        let audit = prefetched
            .and_then(|_| self.record(descriptors, &call, request.as_ref(), &mut cache));
        if let Err(e) = &audit {
            metrics::BUILD_ERRORS.with_label_values(&[e.kind()]).inc();
            error!("Audit recording failed for {}: {}", call.qualified_method(), e);
        }

        Intercepted { result, audit }
    }

    /// After pass: resolve `descriptors` against the completed `call` and the
    /// current chain context, then publish. Returns the number of records.
    pub fn record(
        &self,
        descriptors: &[LogDescriptor],
        call: &CallContext,
        request: Option<&RequestMeta>,
        cache: &mut FunctionCache,
    ) -> Result<usize> {
        let env = Environment::after_call(call, chain::snapshot().unwrap_or_default());
        let records = self.build_records(descriptors, &env, request, cache)?;
        if records.is_empty() {
            return Ok(0);
        }
        let count = records.len();
        self.publisher.publish(records)?;
        Ok(count)
    }

    /// Resolve each descriptor, in declaration order, into at most one record.
    pub fn build_records(
        &self,
        descriptors: &[LogDescriptor],
        env: &Environment<'_>,
        request: Option<&RequestMeta>,
        cache: &mut FunctionCache,
    ) -> Result<Vec<AuditRecord>> {
        let parser = TemplateParser::new(&self.functions);
        let method = env.call().qualified_method();
        let mut records = Vec::with_capacity(descriptors.len());

        for d in descriptors {
            if !d.condition.is_empty()
                && !resolved_truthy(&parser.resolve(&d.condition, env, cache)?)
            {
                metrics::RECORDS_SKIPPED.inc();
                debug!("Condition suppressed {} record for {}", d.kind, method);
                continue;
            }

            let success = if d.success_condition.is_empty() {
                !env.call().failed()
            } else {
                resolved_truthy(&parser.resolve(&d.success_condition, env, cache)?)
            };
            let content = if success { &d.action } else { &d.fail };
            if content.is_empty() {
                debug!(
                    "No {} template for {} record of {}",
                    if success { "action" } else { "fail" },
                    d.kind,
                    method
                );
                continue;
            }

            let templates = [
                d.kind.as_str(),
                d.sub_type.as_str(),
                d.resource_id.as_str(),
                d.operator.as_str(),
                content.as_str(),
                d.extra.as_str(),
            ];
            let resolved = parser.resolve_all(templates, env, cache)?;
            let text = |template: &str| resolved.get(template).cloned().unwrap_or_default();

            let mut operator = text(d.operator.as_str());
            if operator.trim().is_empty() {
                operator = self.operators.current_operator();
            }

            records.push(build_record(
                ResolvedDescriptor {
                    kind: text(d.kind.as_str()),
                    sub_type: text(d.sub_type.as_str()),
                    resource_id: text(d.resource_id.as_str()),
                    operator,
                    content: text(content.as_str()),
                    extra: text(d.extra.as_str()),
                    success,
                },
                &method,
                request,
            ));
            metrics::RECORDS_TOTAL
                .with_label_values(&[if success { "success" } else { "failure" }])
                .inc();
        }

        Ok(records)
    }
}
