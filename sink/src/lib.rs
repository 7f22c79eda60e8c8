//! Publishing side of oplog
//!
//! Finished records are wrapped into an immutable [`AuditBatch`] by the
//! [`EventPublisher`] and delivered, off the caller's task, to every
//! registered [`AuditHandler`].
//!
//! [`AuditBatch`]: oplog_shared::AuditBatch

pub mod audit;
pub mod handler;
pub mod memory;
pub mod metrics;
pub mod publisher;

pub use audit::TracingHandler;
pub use handler::AuditHandler;
pub use memory::InMemoryHandler;
pub use publisher::EventPublisher;
