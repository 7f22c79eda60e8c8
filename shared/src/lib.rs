//! Shared types and errors for oplog
//!
//! This crate contains the data model passed between the template engine, the
//! record builder and the publishing sink: log descriptors, intercepted call
//! metadata, audit records and the batches handed to handlers.

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{OplogError, Result};
pub use types::{call::*, descriptor::*, record::*};
