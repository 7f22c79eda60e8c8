//! Operation-log engine
//!
//! Turns declarative [`LogDescriptor`]s into audit records for each audited
//! call: templates such as `"update user {userName{#userId}}"` are resolved
//! against the call's arguments, its outcome and the chain-local context
//! ([`chain`]), then published through an [`oplog_sink::EventPublisher`].
//!
//! ```ignore
//! let pipeline = Pipeline::start(&EngineConfig::default(), FunctionRegistry::with_builtins())?;
//! let out = pipeline
//!     .interceptor
//!     .intercept(&[LogDescriptor::new("USER", "update user {{#userId}}")], call, None, || async {
//!         users.update(id).await
//!     })
//!     .await;
//! ```

pub mod builder;
pub mod cache;
pub mod chain;
pub mod config;
pub mod context;
pub mod environment;
pub mod expr;
pub mod function;
pub mod interceptor;
pub mod template;

pub use cache::FunctionCache;
pub use config::{EngineConfig, HandlerKind, LogFormat};
pub use context::ContextStack;
pub use environment::Environment;
pub use function::{FnResolver, FunctionRegistry, ResolverFunction};
pub use interceptor::{Intercepted, Interceptor, OperatorSource, StaticOperator};
pub use oplog_sink::metrics;
pub use oplog_shared::{
    AuditBatch, AuditRecord, CallContext, LogDescriptor, OplogError, RequestMeta, Result,
};
pub use template::TemplateParser;

use oplog_sink::{AuditHandler, EventPublisher, InMemoryHandler, TracingHandler};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Interceptor wired to the handlers selected by an [`EngineConfig`].
pub struct Pipeline {
    pub interceptor: Interceptor,
    /// Present when the memory handler is configured
    pub memory: Option<Arc<InMemoryHandler>>,
    consumer: JoinHandle<()>,
}

impl Pipeline {
    /// Validate `config` and start the publisher on the current runtime.
    pub fn start(config: &EngineConfig, functions: FunctionRegistry) -> Result<Self> {
        config.validate()?;

        let mut memory = None;
        let mut handlers: Vec<Arc<dyn AuditHandler>> = Vec::with_capacity(config.handlers.len());
        for kind in &config.handlers {
            match kind {
                HandlerKind::Tracing => handlers.push(Arc::new(TracingHandler::new())),
                HandlerKind::Memory => {
                    let handler = Arc::new(InMemoryHandler::new(config.buffer_capacity));
                    memory = Some(handler.clone());
                    handlers.push(handler);
                }
            }
        }
        if handlers.is_empty() {
            warn!("No audit handlers configured; records will be discarded");
        }

        info!(
            "Starting oplog pipeline with {} handler(s), {} resolver function(s)",
            handlers.len(),
            functions.len()
        );
        let (publisher, consumer) = EventPublisher::spawn(handlers);
        let interceptor = Interceptor::new(functions, publisher)
            .with_operator_source(StaticOperator::new(config.default_operator.clone()));

        Ok(Self {
            interceptor,
            memory,
            consumer,
        })
    }

    /// Close the publisher and wait until every queued batch was delivered.
    ///
    /// Clones of the interceptor keep the publisher open; drop them first.
    pub async fn shutdown(self) -> Option<Arc<InMemoryHandler>> {
        let Pipeline {
            interceptor,
            memory,
            consumer,
        } = self;
        drop(interceptor);
        if let Err(e) = consumer.await {
            warn!("Publisher task ended abnormally: {}", e);
        }
        debug!("oplog pipeline stopped");
        memory
    }
}
