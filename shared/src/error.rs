//! Error type shared by every oplog crate.

use thiserror::Error;

pub type Result<T, E = OplogError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum OplogError {
    /// Caller handed the engine something it can never accept (e.g. an empty batch).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The `extra` payload of a descriptor did not decode.
    #[error("malformed payload: {reason}")]
    MalformedPayload { reason: String },

    /// Syntax or evaluation error inside an embedded expression.
    #[error("expression `{expression}`: {message}")]
    Expression { expression: String, message: String },

    /// A resolver function failed while post-processing a value.
    #[error("resolver `{function}` failed: {message}")]
    Resolver { function: String, message: String },

    #[error("unknown resolver function `{0}`")]
    UnknownFunction(String),

    /// A chain-scoped context write happened outside of any call chain.
    #[error("no active call chain")]
    NoActiveChain,

    /// The publisher's consumer task is gone.
    #[error("publisher closed")]
    PublisherClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl OplogError {
    pub fn expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn resolver(function: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Resolver {
            function: function.into(),
            message: message.to_string(),
        }
    }

    /// Short, stable label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::Expression { .. } => "expression",
            Self::Resolver { .. } => "resolver",
            Self::UnknownFunction(_) => "unknown_function",
            Self::NoActiveChain => "no_active_chain",
            Self::PublisherClosed => "publisher_closed",
            Self::Config(_) => "config",
        }
    }
}
