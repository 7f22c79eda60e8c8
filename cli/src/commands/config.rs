//! Config command - print the effective configuration as TOML

use anyhow::Result;
use oplog_engine::EngineConfig;

use crate::output;

pub fn run(config: &EngineConfig) -> Result<()> {
    let text = toml::to_string_pretty(config)?;
    print!("{}", text);
    output::success("Configuration is valid");
    Ok(())
}
