//! CLI subcommands.

mod render;
mod validate;

use clap::Subcommand;
use pricetag_core::RuntimeConfig;
pub use render::RenderArgs;
pub use validate::ValidateArgs;

/// Available subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Parse and validate a helper configuration file.
    Validate(ValidateArgs),
    /// Print the DOM contract and consent entries a configuration produces.
    Render(RenderArgs),
}

impl Command {
    /// Runs the subcommand.
    ///
    /// # Errors
    ///
    /// Returns the subcommand's error with context.
    pub fn run(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        match self {
            Self::Validate(args) => args.run(runtime),
            Self::Render(args) => args.run(runtime),
        }
    }
}
