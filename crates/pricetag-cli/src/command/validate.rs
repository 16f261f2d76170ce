//! `pricetag validate`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use pricetag_core::RuntimeConfig;

use crate::TRACING_TARGET_COMMAND;
use crate::config::load_helper_config;

/// Arguments of `pricetag validate`.
#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Path to the helper configuration JSON file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

impl ValidateArgs {
    /// Validates the configuration and the vendor URL derived from it.
    pub fn run(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        let config = load_helper_config(&self.config)?;
        let script_url = runtime
            .script_url(&config.code)
            .context("failed to build vendor script url")?;

        tracing::info!(
            target: TRACING_TARGET_COMMAND,
            slots = config.pricetag_configs.len(),
            script_url = %script_url,
            "configuration is valid"
        );
        println!(
            "{}: ok ({} slot(s))",
            self.config.display(),
            config.pricetag_configs.len()
        );

        Ok(())
    }
}
