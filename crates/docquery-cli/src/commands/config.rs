//! Config command

use crate::app::OutputFormat;
use anyhow::Result;
use docquery_core::Config;

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Cli => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}
