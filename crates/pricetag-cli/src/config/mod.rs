//! CLI configuration.
//!
//! ```text
//! Cli
//! ├── runtime: RuntimeConfig   # Vendor host and runtime timings
//! └── command: Command         # validate | render
//! ```
//!
//! Runtime options can be given as arguments or `PRICETAG_*` environment
//! variables. Use `--help` to see all of them.

use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use pricetag_core::{GlobalConfig, RuntimeConfig};

use crate::TRACING_TARGET_CONFIG;
use crate::command::Command;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "pricetag")]
#[command(about = "Validate and render pricetag helper configurations")]
#[command(version)]
pub struct Cli {
    /// Vendor endpoint and runtime timings.
    #[clap(flatten)]
    pub runtime: RuntimeConfig,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}
}

/// Reads, parses and validates a helper configuration file.
///
/// # Errors
///
/// Returns an error naming the file when it cannot be read, is not a valid
/// configuration document, or fails validation.
pub fn load_helper_config(path: &Path) -> anyhow::Result<GlobalConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let config = GlobalConfig::from_json(&json)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    config
        .check()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;

    tracing::debug!(
        target: TRACING_TARGET_CONFIG,
        path = %path.display(),
        code = %config.code,
        slots = config.pricetag_configs.len(),
        "loaded helper configuration"
    );

    Ok(config)
}
