//! Config CLI command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{key_value_table, output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print the merged configuration as YAML
    #[arg(long)]
    pub yaml: bool,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    pub source: String,
    pub config: Config,
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        let config = &self.config;
        let log_dir = config
            .logging
            .log_dir
            .as_ref()
            .map_or_else(|| "-".to_string(), |dir| dir.display().to_string());

        let rows = [
            ("lifetime", config.lifetime.as_str().to_string()),
            (
                "instrumentation.enabled",
                config.instrumentation.enabled.to_string(),
            ),
            (
                "instrumentation.slow_threshold_ms",
                config.instrumentation.slow_threshold_ms.to_string(),
            ),
            ("logging.level", config.logging.level.clone()),
            ("logging.format", config.logging.format.clone()),
            ("logging.log_dir", log_dir),
            ("logging.rotation", config.logging.rotation.clone()),
        ];

        format!(
            "Configuration ({})\n{}",
            self.source,
            key_value_table(("Setting", "Value"), rows)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: &ConfigArgs, config: &Config, source: &str, json: bool) -> Result<()> {
    if args.yaml && !json {
        let rendered = serde_yaml::to_string(config).context("Failed to render configuration")?;
        print!("{rendered}");
        return Ok(());
    }

    let result = ConfigOutput {
        source: source.to_string(),
        config: config.clone(),
    };
    output(&result, json);
    Ok(())
}
