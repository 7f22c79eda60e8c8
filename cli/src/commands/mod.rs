pub mod config;
pub mod render;
pub mod run;

use anyhow::{bail, Result};
use serde_json::Value;

/// Parse `name=value`; the value is read as JSON and falls back to a plain string.
pub fn parse_binding(s: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = s.split_once('=') else {
        bail!("expected name=value, got `{}`", s);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("empty variable name in `{}`", s);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}
