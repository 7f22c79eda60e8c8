//! Engine configuration
//!
//! Loaded from built-in defaults, then an optional TOML file, then `OPLOG_*`
//! environment variables (e.g. `OPLOG_DEFAULT_OPERATOR=batch`). List values
//! such as `handlers` can only be set from the file.

use oplog_shared::{OplogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in handler selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Emit records as `tracing` events on `oplog::audit`
    Tracing,
    /// Keep records in a bounded in-memory ring buffer
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = OplogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(OplogError::Config(format!("invalid log format: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operator recorded when a descriptor's operator resolves empty
    pub default_operator: String,

    /// Handlers registered with the publisher, in delivery order
    pub handlers: Vec<HandlerKind>,

    /// Max records kept by the in-memory handler
    pub buffer_capacity: usize,

    /// Log output format for binaries
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_operator: "system".to_string(),
            handlers: vec![HandlerKind::Tracing],
            buffer_capacity: 10_000,
            log_format: LogFormat::Text,
        }
    }
}

impl EngineConfig {
    /// Load configuration, layering `path` (if any) and the environment over defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("OPLOG").try_parsing(true))
            .build()
            .map_err(|e| OplogError::Config(e.to_string()))?
            .try_deserialize::<EngineConfig>()
            .map_err(|e| OplogError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_operator.trim().is_empty() {
            return Err(OplogError::Config(
                "default_operator must not be empty".to_string(),
            ));
        }

        if self.handlers.contains(&HandlerKind::Memory) && self.buffer_capacity == 0 {
            return Err(OplogError::Config(
                "buffer_capacity must be greater than 0 for the memory handler".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.handlers, vec![HandlerKind::Tracing]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "default_operator = \"batch\"\nhandlers = [\"memory\", \"tracing\"]\nbuffer_capacity = 5\nlog_format = \"json\""
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.default_operator, "batch");
        assert_eq!(config.handlers, vec![HandlerKind::Memory, HandlerKind::Tracing]);
        assert_eq!(config.buffer_capacity, 5);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "buffer_capacity = 12").unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.buffer_capacity, 12);
        assert_eq!(config.default_operator, "system");
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/oplog.toml"))).unwrap_err();
        assert!(matches!(err, OplogError::Config(_)));
    }

    #[test]
    fn test_validation() {
        let config = EngineConfig {
            handlers: vec![HandlerKind::Memory],
            buffer_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            default_operator: "  ".to_string(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
