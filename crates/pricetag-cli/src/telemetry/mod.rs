//! Log output of the `pricetag` binary.
//!
//! Command results (the `render` JSON, the `validate` summary) are the only
//! thing written to stdout, so they can be piped into other tools. Every
//! diagnostic event goes to stderr.

use std::io::IsTerminal;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset: helper crates at `info`, the rest
/// at `warn`.
const DEFAULT_FILTER: &str = "warn,pricetag_cli=info,pricetag_runtime=info,pricetag_consent=info";

/// Installs the stderr subscriber.
///
/// ```bash
/// RUST_LOG=pricetag_runtime::watcher=debug pricetag render ./helper.json > page.json
/// ```
///
/// # Errors
///
/// Returns an error if `RUST_LOG` does not parse or a subscriber is
/// already installed.
pub(crate) fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(stderr_layer())
        .with(env_filter()?)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

fn env_filter() -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .map_err(|e| anyhow::anyhow!("Invalid {}: {e}", EnvFilter::DEFAULT_ENV)),
        Err(_) => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
}
